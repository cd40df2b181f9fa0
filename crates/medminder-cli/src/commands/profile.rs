use chrono::NaiveDate;
use clap::Subcommand;
use medminder_core::{ProfileUpdate, ProfileViewModel, Resource, UserProfile};

use crate::context::{CliResult, Context};

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Show the profile
    Show {
        #[arg(long)]
        json: bool,
    },
    /// Edit personal details; an empty value clears a field
    Set {
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        date_of_birth: Option<NaiveDate>,
    },
    /// Change notification settings
    Notifications {
        #[arg(long)]
        enabled: Option<bool>,
        /// Minutes before an appointment to remind
        #[arg(long)]
        reminder_minutes: Option<u32>,
        #[arg(long)]
        sound: Option<bool>,
        #[arg(long)]
        vibration: Option<bool>,
    },
}

pub async fn run(action: ProfileAction) -> CliResult {
    let ctx = Context::open()?;
    let mut vm = ProfileViewModel::new(ctx.backend.clone(), ctx.prefs());
    if let Resource::Error(msg) = vm.load().await {
        return Err(msg.clone().into());
    }

    match action {
        ProfileAction::Show { json } => {
            if let Some(profile) = vm.profile().data() {
                if json {
                    println!("{}", serde_json::to_string_pretty(profile)?);
                } else {
                    print_profile(profile);
                }
            }
        }
        ProfileAction::Set {
            full_name,
            phone,
            date_of_birth,
        } => {
            let profile = vm
                .update_profile(ProfileUpdate {
                    full_name,
                    phone,
                    date_of_birth,
                })
                .await?;
            print_profile(&profile);
        }
        ProfileAction::Notifications {
            enabled,
            reminder_minutes,
            sound,
            vibration,
        } => {
            let mut prefs = vm
                .profile()
                .data()
                .map(UserProfile::notification_preferences)
                .unwrap_or_default();
            if let Some(v) = enabled {
                prefs.enabled = v;
            }
            if let Some(v) = reminder_minutes {
                prefs.reminder_minutes = v;
            }
            if let Some(v) = sound {
                prefs.sound = v;
            }
            if let Some(v) = vibration {
                prefs.vibration = v;
            }
            let profile = vm.update_notification_preferences(prefs).await?;
            print_profile(&profile);
        }
    }
    Ok(())
}

fn print_profile(p: &UserProfile) {
    let or_dash = |v: Option<&str>| v.unwrap_or("-").to_string();
    println!("id:             {}", p.id);
    println!("email:          {}", p.email);
    println!("name:           {}", or_dash(p.full_name.as_deref()));
    println!("phone:          {}", or_dash(p.phone.as_deref()));
    println!(
        "date of birth:  {}",
        p.date_of_birth.map_or_else(|| "-".to_string(), |d| d.to_string())
    );
    println!(
        "notifications:  {} (remind {} min before, sound {}, vibration {})",
        if p.notifications_enabled { "on" } else { "off" },
        p.reminder_minutes,
        p.sound_enabled,
        p.vibration_enabled
    );
}
