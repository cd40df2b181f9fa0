use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AlarmError, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    /// Completed and cancelled appointments never change again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AppointmentStatus::Scheduled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" | "canceled" => Ok(AppointmentStatus::Cancelled),
            other => Err(ValidationError::InvalidValue {
                field: "status".into(),
                message: format!("unknown status '{other}'"),
            }),
        }
    }
}

/// A doctor's appointment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub user_id: String,
    pub doctor_name: String,
    pub specialty: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:mm`
    pub time: String,
    pub location: String,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Appointment {
    pub fn parsed_date(&self) -> Result<NaiveDate, AlarmError> {
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").map_err(|_| AlarmError::InvalidTime {
            field: "date",
            value: self.date.clone(),
        })
    }

    pub fn parsed_time(&self) -> Result<NaiveTime, AlarmError> {
        NaiveTime::parse_from_str(&self.time, "%H:%M").map_err(|_| AlarmError::InvalidTime {
            field: "time",
            value: self.time.clone(),
        })
    }

    /// Local wall-clock start of the appointment.
    pub fn starts_at(&self) -> Result<NaiveDateTime, AlarmError> {
        Ok(self.parsed_date()?.and_time(self.parsed_time()?))
    }

    pub fn is_scheduled(&self) -> bool {
        self.status == AppointmentStatus::Scheduled
    }

    /// Move to `next`, rejecting any change out of a terminal status.
    pub fn transition(&mut self, next: AppointmentStatus) -> Result<(), ValidationError> {
        if self.status == next {
            return Ok(());
        }
        if self.status.is_terminal() {
            return Err(ValidationError::TerminalStatus(self.status.to_string()));
        }
        self.status = next;
        Ok(())
    }
}

/// User input for a new or edited appointment.
#[derive(Debug, Clone, Default)]
pub struct AppointmentDraft {
    pub doctor_name: String,
    pub specialty: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub notes: Option<String>,
}

impl AppointmentDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.doctor_name.trim().is_empty() {
            return Err(ValidationError::EmptyField("doctor_name"));
        }
        if NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").is_err() {
            return Err(ValidationError::InvalidValue {
                field: "date".into(),
                message: format!("expected YYYY-MM-DD, got '{}'", self.date),
            });
        }
        if NaiveTime::parse_from_str(&self.time, "%H:%M").is_err() {
            return Err(ValidationError::InvalidValue {
                field: "time".into(),
                message: format!("expected HH:mm, got '{}'", self.time),
            });
        }
        Ok(())
    }

    pub fn into_appointment(self, id: String, user_id: String) -> Appointment {
        Appointment {
            id,
            user_id,
            doctor_name: self.doctor_name.trim().to_string(),
            specialty: self.specialty.trim().to_string(),
            date: self.date,
            time: self.time,
            location: self.location.trim().to_string(),
            status: AppointmentStatus::Scheduled,
            notes: self.notes.filter(|n| !n.trim().is_empty()),
        }
    }

    /// Overwrite the editable fields of `appt`, keeping id, owner and status.
    pub fn apply_to(self, appt: &mut Appointment) {
        appt.doctor_name = self.doctor_name.trim().to_string();
        appt.specialty = self.specialty.trim().to_string();
        appt.date = self.date;
        appt.time = self.time;
        appt.location = self.location.trim().to_string();
        appt.notes = self.notes.filter(|n| !n.trim().is_empty());
    }
}

// ── Filtering ────────────────────────────────────────────────────────

/// Appointments on `date`, ordered by time.
pub fn on_date(appointments: &[Appointment], date: NaiveDate) -> Vec<Appointment> {
    let key = date.format("%Y-%m-%d").to_string();
    let mut out: Vec<_> = appointments
        .iter()
        .filter(|a| a.date == key)
        .cloned()
        .collect();
    out.sort_by(|a, b| a.time.cmp(&b.time));
    out
}

pub fn with_status(appointments: &[Appointment], status: AppointmentStatus) -> Vec<Appointment> {
    appointments
        .iter()
        .filter(|a| a.status == status)
        .cloned()
        .collect()
}

/// Scheduled appointments on or after `today`, soonest first.
///
/// Rows with an unparseable date are dropped.
pub fn upcoming(appointments: &[Appointment], today: NaiveDate) -> Vec<Appointment> {
    let mut out: Vec<_> = appointments
        .iter()
        .filter(|a| a.is_scheduled())
        .filter(|a| a.parsed_date().map(|d| d >= today).unwrap_or(false))
        .cloned()
        .collect();
    sort_chronologically(&mut out);
    out
}

/// Appointments before `today` or no longer scheduled, most recent first.
pub fn past(appointments: &[Appointment], today: NaiveDate) -> Vec<Appointment> {
    let mut out: Vec<_> = appointments
        .iter()
        .filter(|a| !a.is_scheduled() || a.parsed_date().map(|d| d < today).unwrap_or(false))
        .cloned()
        .collect();
    sort_chronologically(&mut out);
    out.reverse();
    out
}

fn sort_chronologically(list: &mut [Appointment]) {
    list.sort_by(|a, b| (a.date.as_str(), a.time.as_str()).cmp(&(b.date.as_str(), b.time.as_str())));
}
