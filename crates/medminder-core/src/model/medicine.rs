use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::schedule::{calculate_schedule, parse_frequency_hours};

/// A medication the user takes on a fixed daily rhythm.
///
/// `times` is derived from `frequency` and the first dose time and must be
/// recomputed (see [`Medicine::reschedule`]) whenever either changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medicine {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub dosage: String,
    /// Interval descriptor in hours, e.g. `"8"`.
    pub frequency: String,
    /// Daily dose times, `HH:mm`, in slot order.
    #[serde(default)]
    pub times: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

/// User input for a new or edited medicine.
#[derive(Debug, Clone, Default)]
pub struct MedicineDraft {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    /// First dose of the day, `HH:mm`.
    pub start_time: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl MedicineDraft {
    /// Check required fields.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyField("name"));
        }
        if self.dosage.trim().is_empty() {
            return Err(ValidationError::EmptyField("dosage"));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(ValidationError::InvalidValue {
                    field: "end_date".into(),
                    message: format!("{end} is before start date {start}"),
                });
            }
        }
        Ok(())
    }

    /// Build a fresh active medicine owned by `user_id`.
    pub fn into_medicine(self, id: String, user_id: String, today: NaiveDate) -> Medicine {
        let times = calculate_schedule(parse_frequency_hours(&self.frequency), &self.start_time);
        Medicine {
            id,
            user_id,
            name: self.name.trim().to_string(),
            dosage: self.dosage.trim().to_string(),
            frequency: self.frequency,
            times,
            is_active: true,
            start_date: self.start_date.unwrap_or(today),
            end_date: self.end_date,
            notes: self.notes.filter(|n| !n.trim().is_empty()),
            created_at: None,
        }
    }
}

impl Medicine {
    /// Number of alarm slots this medicine occupies.
    pub fn slot_count(&self) -> usize {
        self.times.len()
    }

    /// First dose time of the day, if any.
    pub fn first_time(&self) -> Option<&str> {
        self.times.first().map(String::as_str)
    }

    /// Recompute `times` from a new frequency and/or first dose time.
    ///
    /// Missing arguments keep the current value.
    pub fn reschedule(&mut self, frequency: Option<&str>, start_time: Option<&str>) {
        if let Some(f) = frequency {
            self.frequency = f.to_string();
        }
        let start = start_time
            .map(str::to_string)
            .or_else(|| self.first_time().map(str::to_string))
            .unwrap_or_default();
        self.times = calculate_schedule(parse_frequency_hours(&self.frequency), &start);
    }

    /// Whether `date` falls inside the prescription window.
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.start_date && self.end_date.map_or(true, |end| date <= end)
    }

    /// Whether the medicine should have alarms registered.
    pub fn wants_alarms(&self) -> bool {
        self.is_active && !self.times.is_empty()
    }
}
