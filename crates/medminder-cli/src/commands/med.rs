use chrono::NaiveDate;
use clap::Subcommand;
use medminder_core::{calculate_schedule, parse_frequency_hours, DoseFrequency, Medicine, MedicineDraft, MedicineViewModel, Resource};

use crate::context::{CliResult, Context};

#[derive(Subcommand)]
pub enum MedAction {
    /// List medicines
    List {
        /// Only active medicines covering today
        #[arg(long)]
        today: bool,
        #[arg(long)]
        json: bool,
    },
    /// Add a medicine and schedule its dose reminders
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        dosage: String,
        /// Hours between doses (4, 6, 8, 12 or 24)
        #[arg(long, default_value = "8")]
        frequency: String,
        /// First dose of the day, HH:mm
        #[arg(long, default_value = "08:00")]
        start: String,
        #[arg(long)]
        start_date: Option<NaiveDate>,
        #[arg(long)]
        end_date: Option<NaiveDate>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Edit a medicine; dose times are recomputed
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        dosage: Option<String>,
        #[arg(long)]
        frequency: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end_date: Option<NaiveDate>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Resume reminders for a medicine
    Activate { id: String },
    /// Stop reminders without deleting
    Deactivate { id: String },
    /// Delete a medicine and its reminders
    Delete { id: String },
    /// Show the dose times a frequency and start time produce
    Times {
        #[arg(long)]
        frequency: String,
        #[arg(long, default_value = "08:00")]
        start: String,
    },
    /// List the offered frequency presets
    Presets,
}

pub async fn run(action: MedAction) -> CliResult {
    // Pure calculations need no session.
    match action {
        MedAction::Times { frequency, start } => {
            let times = calculate_schedule(parse_frequency_hours(&frequency), &start);
            println!("{}", times.join(" "));
            return Ok(());
        }
        MedAction::Presets => {
            for preset in DoseFrequency::ALL {
                println!("{:>2}h  {}", preset.hours(), preset.label());
            }
            return Ok(());
        }
        _ => {}
    }

    let ctx = Context::open()?;
    let mut vm = MedicineViewModel::new(
        ctx.backend.clone(),
        ctx.local.manager(),
        ctx.prefs(),
        ctx.local.clock.clone(),
    );
    if let Resource::Error(msg) = vm.load().await {
        return Err(msg.clone().into());
    }

    match action {
        MedAction::List { today, json } => {
            let list = if today {
                vm.due_today()
            } else {
                vm.medicines().data().cloned().unwrap_or_default()
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&list)?);
            } else if list.is_empty() {
                println!("no medicines");
            } else {
                for m in &list {
                    print_medicine(m);
                }
            }
        }
        MedAction::Add {
            name,
            dosage,
            frequency,
            start,
            start_date,
            end_date,
            notes,
        } => {
            let med = vm
                .add(MedicineDraft {
                    name,
                    dosage,
                    frequency,
                    start_time: start,
                    start_date,
                    end_date,
                    notes,
                })
                .await?;
            println!("Medicine added: {}", med.id);
            print_medicine(&med);
        }
        MedAction::Edit {
            id,
            name,
            dosage,
            frequency,
            start,
            end_date,
            notes,
        } => {
            let current = vm
                .medicines()
                .data()
                .and_then(|list| list.iter().find(|m| m.id == id))
                .cloned()
                .ok_or_else(|| format!("medicine '{id}' not found"))?;
            let draft = MedicineDraft {
                name: name.unwrap_or(current.name),
                dosage: dosage.unwrap_or(current.dosage),
                frequency: frequency.unwrap_or(current.frequency),
                start_time: start.unwrap_or_default(),
                start_date: Some(current.start_date),
                end_date: end_date.or(current.end_date),
                notes: notes.or(current.notes),
            };
            let med = vm.update(&id, draft).await?;
            println!("Medicine updated: {}", med.id);
            print_medicine(&med);
        }
        MedAction::Activate { id } => {
            vm.set_active(&id, true).await?;
            println!("Medicine activated: {id}");
        }
        MedAction::Deactivate { id } => {
            vm.set_active(&id, false).await?;
            println!("Medicine deactivated: {id}");
        }
        MedAction::Delete { id } => {
            vm.delete(&id).await?;
            println!("Medicine deleted: {id}");
        }
        MedAction::Times { .. } | MedAction::Presets => {}
    }
    Ok(())
}

fn print_medicine(m: &Medicine) {
    let state = if m.is_active { "active" } else { "inactive" };
    println!(
        "{}  {} {}  every {}h at {}  [{}]",
        m.id,
        m.name,
        m.dosage,
        parse_frequency_hours(&m.frequency),
        m.times.join(", "),
        state
    );
}
