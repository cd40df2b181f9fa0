use chrono::NaiveDate;
use clap::Subcommand;
use medminder_core::{Appointment, AppointmentDraft, AppointmentStatus, AppointmentViewModel, Resource};

use crate::context::{CliResult, Context};

#[derive(Subcommand)]
pub enum ApptAction {
    /// List appointments
    List {
        /// Scheduled and on or after today
        #[arg(long, conflicts_with_all = ["past", "date", "status"])]
        upcoming: bool,
        /// Before today or closed
        #[arg(long, conflicts_with_all = ["date", "status"])]
        past: bool,
        /// On one day (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// scheduled, completed or cancelled
        #[arg(long)]
        status: Option<AppointmentStatus>,
        #[arg(long)]
        json: bool,
    },
    /// Book an appointment and schedule its reminder
    Add {
        #[arg(long)]
        doctor: String,
        #[arg(long, default_value = "")]
        specialty: String,
        /// YYYY-MM-DD
        #[arg(long)]
        date: String,
        /// HH:mm
        #[arg(long)]
        time: String,
        #[arg(long, default_value = "")]
        location: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Edit an appointment; its reminder moves with it
    Edit {
        id: String,
        #[arg(long)]
        doctor: Option<String>,
        #[arg(long)]
        specialty: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        time: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Mark cancelled and drop the reminder
    Cancel { id: String },
    /// Mark completed and drop the reminder
    Complete { id: String },
    /// Delete an appointment and its reminder
    Delete { id: String },
}

pub async fn run(action: ApptAction) -> CliResult {
    let ctx = Context::open()?;
    let mut vm = AppointmentViewModel::new(
        ctx.backend.clone(),
        ctx.local.manager(),
        ctx.prefs(),
        ctx.local.clock.clone(),
    );
    if let Resource::Error(msg) = vm.load().await {
        return Err(msg.clone().into());
    }

    match action {
        ApptAction::List {
            upcoming,
            past,
            date,
            status,
            json,
        } => {
            let mut list = if upcoming {
                vm.upcoming()
            } else if past {
                vm.past()
            } else if let Some(date) = date {
                vm.on_date(date)
            } else {
                vm.appointments().data().cloned().unwrap_or_default()
            };
            if let Some(status) = status {
                list.retain(|a| a.status == status);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&list)?);
            } else if list.is_empty() {
                println!("no appointments");
            } else {
                for a in &list {
                    print_appointment(a);
                }
            }
        }
        ApptAction::Add {
            doctor,
            specialty,
            date,
            time,
            location,
            notes,
        } => {
            let appt = vm
                .add(AppointmentDraft {
                    doctor_name: doctor,
                    specialty,
                    date,
                    time,
                    location,
                    notes,
                })
                .await?;
            println!("Appointment added: {}", appt.id);
            print_appointment(&appt);
        }
        ApptAction::Edit {
            id,
            doctor,
            specialty,
            date,
            time,
            location,
            notes,
        } => {
            let current = vm
                .appointments()
                .data()
                .and_then(|list| list.iter().find(|a| a.id == id))
                .cloned()
                .ok_or_else(|| format!("appointment '{id}' not found"))?;
            let draft = AppointmentDraft {
                doctor_name: doctor.unwrap_or(current.doctor_name),
                specialty: specialty.unwrap_or(current.specialty),
                date: date.unwrap_or(current.date),
                time: time.unwrap_or(current.time),
                location: location.unwrap_or(current.location),
                notes: notes.or(current.notes),
            };
            let appt = vm.update(&id, draft).await?;
            println!("Appointment updated: {}", appt.id);
            print_appointment(&appt);
        }
        ApptAction::Cancel { id } => {
            vm.cancel(&id).await?;
            println!("Appointment cancelled: {id}");
        }
        ApptAction::Complete { id } => {
            vm.complete(&id).await?;
            println!("Appointment completed: {id}");
        }
        ApptAction::Delete { id } => {
            vm.delete(&id).await?;
            println!("Appointment deleted: {id}");
        }
    }
    Ok(())
}

fn print_appointment(a: &Appointment) {
    let place = if a.location.is_empty() {
        String::new()
    } else {
        format!(" @ {}", a.location)
    };
    println!(
        "{}  {} {}  {}{}  [{}]",
        a.id, a.date, a.time, a.doctor_name, place, a.status
    );
}
