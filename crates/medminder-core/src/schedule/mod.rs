//! Dose schedule calculator.
//!
//! Turns a dosing interval (hours) and the first dose of the day into the
//! list of daily clock times at which the medicine is taken.
//!
//! ```text
//! calculate_schedule(8, "08:00") == ["08:00", "16:00", "00:00"]
//! ```
//!
//! The slot count is `24 / hours` with integer division. Intervals that do not
//! divide 24 yield fewer slots; intervals above 24 yield none.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Interval used when a frequency descriptor cannot be parsed.
pub const DEFAULT_FREQUENCY_HOURS: u32 = 8;

/// First dose used when the start time cannot be parsed.
pub const DEFAULT_START_TIME: &str = "08:00";

/// Preset intervals offered when creating a medicine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoseFrequency {
    Every4Hours,
    Every6Hours,
    Every8Hours,
    Every12Hours,
    OnceDaily,
}

impl DoseFrequency {
    pub const ALL: [DoseFrequency; 5] = [
        DoseFrequency::Every4Hours,
        DoseFrequency::Every6Hours,
        DoseFrequency::Every8Hours,
        DoseFrequency::Every12Hours,
        DoseFrequency::OnceDaily,
    ];

    pub fn hours(&self) -> u32 {
        match self {
            DoseFrequency::Every4Hours => 4,
            DoseFrequency::Every6Hours => 6,
            DoseFrequency::Every8Hours => 8,
            DoseFrequency::Every12Hours => 12,
            DoseFrequency::OnceDaily => 24,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DoseFrequency::Every4Hours => "Every 4 hours",
            DoseFrequency::Every6Hours => "Every 6 hours",
            DoseFrequency::Every8Hours => "Every 8 hours",
            DoseFrequency::Every12Hours => "Every 12 hours",
            DoseFrequency::OnceDaily => "Once daily",
        }
    }

    /// Descriptor stored on the medicine row.
    pub fn descriptor(&self) -> String {
        self.hours().to_string()
    }

    pub fn from_hours(hours: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.hours() == hours)
    }
}

/// Parse a stored frequency descriptor into hours.
///
/// Anything that is not a positive integer falls back to
/// [`DEFAULT_FREQUENCY_HOURS`].
pub fn parse_frequency_hours(descriptor: &str) -> u32 {
    match descriptor.trim().parse::<u32>() {
        Ok(h) if h > 0 => h,
        _ => DEFAULT_FREQUENCY_HOURS,
    }
}

/// Parse `HH:mm`.
pub fn parse_clock(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

/// Format as zero-padded `HH:mm`.
pub fn format_clock(time: NaiveTime) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}

/// Daily dose times as [`NaiveTime`]s, in slot order.
pub fn dose_times(frequency_hours: u32, start: NaiveTime) -> Vec<NaiveTime> {
    if frequency_hours == 0 {
        return Vec::new();
    }
    let slots = 24 / frequency_hours;
    let start_minutes = start.hour() * 60 + start.minute();
    (0..slots)
        .filter_map(|slot| {
            let minutes = (start_minutes + slot * frequency_hours * 60) % (24 * 60);
            NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
        })
        .collect()
}

/// Daily dose times as `HH:mm` strings.
///
/// An unparseable `start` is treated as [`DEFAULT_START_TIME`].
pub fn calculate_schedule(frequency_hours: u32, start: &str) -> Vec<String> {
    let start = parse_clock(start).unwrap_or_else(|| {
        tracing::debug!(start, "unparseable start time, using {}", DEFAULT_START_TIME);
        NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN)
    });
    dose_times(frequency_hours, start)
        .into_iter()
        .map(format_clock)
        .collect()
}
