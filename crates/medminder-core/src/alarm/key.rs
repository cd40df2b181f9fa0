use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Stable identity of one registered alarm.
///
/// Derived from the entity id (and dose slot) alone, so a cancel can rebuild
/// the key without knowing what was registered before.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlarmKey {
    Dose { medicine_id: String, slot: usize },
    Appointment { appointment_id: String },
}

impl AlarmKey {
    pub fn dose(medicine_id: &str, slot: usize) -> Self {
        AlarmKey::Dose {
            medicine_id: medicine_id.to_string(),
            slot,
        }
    }

    pub fn appointment(appointment_id: &str) -> Self {
        AlarmKey::Appointment {
            appointment_id: appointment_id.to_string(),
        }
    }

    /// Id of the medicine or appointment this alarm belongs to.
    pub fn entity_id(&self) -> &str {
        match self {
            AlarmKey::Dose { medicine_id, .. } => medicine_id,
            AlarmKey::Appointment { appointment_id } => appointment_id,
        }
    }
}

impl fmt::Display for AlarmKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlarmKey::Dose { medicine_id, slot } => write!(f, "dose:{medicine_id}:{slot}"),
            AlarmKey::Appointment { appointment_id } => write!(f, "appointment:{appointment_id}"),
        }
    }
}

impl FromStr for AlarmKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidValue {
            field: "alarm_key".into(),
            message: format!("cannot parse '{s}'"),
        };

        if let Some(rest) = s.strip_prefix("dose:") {
            // Medicine ids may contain ':'; the slot is always the last segment.
            let (id, slot) = rest.rsplit_once(':').ok_or_else(invalid)?;
            let slot = slot.parse::<usize>().map_err(|_| invalid())?;
            if id.is_empty() {
                return Err(invalid());
            }
            return Ok(AlarmKey::dose(id, slot));
        }
        if let Some(id) = s.strip_prefix("appointment:") {
            if id.is_empty() {
                return Err(invalid());
            }
            return Ok(AlarmKey::appointment(id));
        }
        Err(invalid())
    }
}
