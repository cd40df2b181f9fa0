//! Alarm registration for dose and appointment reminders.

mod key;
mod manager;
mod scheduler;

pub use key::AlarmKey;
pub use manager::{next_daily_fire, AlarmManager, ScheduleOutcome, DAY_MS};
pub use scheduler::{AlarmPayload, AlarmScheduler, InMemoryAlarms, RegisteredAlarm};
