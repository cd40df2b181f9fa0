use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use clap::Subcommand;
use medminder_core::{DispatchOutcome, NotificationDispatcher, RegisteredAlarm};

use crate::context::{CliResult, Local as LocalState};
use crate::notifier::TerminalNotifier;

#[derive(Subcommand)]
pub enum AlarmsAction {
    /// List registered alarms
    List {
        #[arg(long)]
        json: bool,
    },
    /// Fire every alarm that is due, as the OS would on wake-up
    Fire,
    /// Remove every registered alarm
    Clear,
}

pub fn run(action: AlarmsAction) -> CliResult {
    let local = LocalState::open()?;
    match action {
        AlarmsAction::List { json } => {
            let alarms = local.alarms.list()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&alarms)?);
            } else if alarms.is_empty() {
                println!("no alarms");
            } else {
                for alarm in &alarms {
                    print_alarm(alarm);
                }
            }
        }
        AlarmsAction::Fire => {
            let now_ms = local.clock.now().timestamp_millis();
            let dispatcher = NotificationDispatcher::new(local.prefs.clone(), Arc::new(TerminalNotifier));
            let due = local.alarms.due(now_ms)?;
            let mut shown = 0;
            for alarm in &due {
                match dispatcher.on_alarm_fired(&alarm.key, &alarm.payload) {
                    DispatchOutcome::Shown => shown += 1,
                    DispatchOutcome::Suppressed => {}
                    DispatchOutcome::Failed { reason } => eprintln!("{}: {reason}", alarm.key),
                }
                local.alarms.mark_fired(&alarm.key, now_ms)?;
            }
            println!("{} due, {} shown", due.len(), shown);
        }
        AlarmsAction::Clear => {
            let removed = local.alarms.clear()?;
            println!("removed {removed} alarms");
        }
    }
    Ok(())
}

fn print_alarm(alarm: &RegisteredAlarm) {
    let when = DateTime::<Utc>::from_timestamp_millis(alarm.fire_at_ms)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| alarm.fire_at_ms.to_string());
    let repeat = if alarm.interval_ms.is_some() { "daily" } else { "once" };
    println!("{when}  {:<5}  {}  {}", repeat, alarm.key, alarm.payload.body);
}
