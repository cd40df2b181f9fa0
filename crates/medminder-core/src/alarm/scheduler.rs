use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;

use super::key::AlarmKey;
use crate::error::AlarmError;

/// Data handed back to the fire handler when an alarm goes off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmPayload {
    pub title: String,
    pub body: String,
}

/// One alarm as held by a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredAlarm {
    pub key: AlarmKey,
    pub fire_at_ms: i64,
    /// `Some` for daily-repeating dose alarms.
    pub interval_ms: Option<i64>,
    pub payload: AlarmPayload,
}

/// Platform alarm service.
///
/// Registering an existing key replaces it. Cancelling an unknown key is a
/// successful no-op.
pub trait AlarmScheduler: Send + Sync {
    fn schedule_repeating(
        &self,
        key: &AlarmKey,
        first_fire_ms: i64,
        interval_ms: i64,
        payload: &AlarmPayload,
    ) -> Result<(), AlarmError>;

    fn schedule_once(
        &self,
        key: &AlarmKey,
        fire_ms: i64,
        payload: &AlarmPayload,
    ) -> Result<(), AlarmError>;

    fn cancel(&self, key: &AlarmKey) -> Result<(), AlarmError>;
}

/// Alarm registry held in memory, keyed by [`AlarmKey`].
#[derive(Debug, Default)]
pub struct InMemoryAlarms {
    alarms: Mutex<BTreeMap<AlarmKey, RegisteredAlarm>>,
}

impl InMemoryAlarms {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<AlarmKey, RegisteredAlarm>> {
        self.alarms.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, key: &AlarmKey) -> Option<RegisteredAlarm> {
        self.lock().get(key).cloned()
    }

    pub fn contains(&self, key: &AlarmKey) -> bool {
        self.lock().contains_key(key)
    }

    /// All alarms, ordered by key.
    pub fn list(&self) -> Vec<RegisteredAlarm> {
        self.lock().values().cloned().collect()
    }

    /// Alarms belonging to one medicine or appointment.
    pub fn for_entity(&self, entity_id: &str) -> Vec<RegisteredAlarm> {
        self.lock()
            .values()
            .filter(|a| a.key.entity_id() == entity_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl AlarmScheduler for InMemoryAlarms {
    fn schedule_repeating(
        &self,
        key: &AlarmKey,
        first_fire_ms: i64,
        interval_ms: i64,
        payload: &AlarmPayload,
    ) -> Result<(), AlarmError> {
        self.lock().insert(
            key.clone(),
            RegisteredAlarm {
                key: key.clone(),
                fire_at_ms: first_fire_ms,
                interval_ms: Some(interval_ms),
                payload: payload.clone(),
            },
        );
        Ok(())
    }

    fn schedule_once(
        &self,
        key: &AlarmKey,
        fire_ms: i64,
        payload: &AlarmPayload,
    ) -> Result<(), AlarmError> {
        self.lock().insert(
            key.clone(),
            RegisteredAlarm {
                key: key.clone(),
                fire_at_ms: fire_ms,
                interval_ms: None,
                payload: payload.clone(),
            },
        );
        Ok(())
    }

    fn cancel(&self, key: &AlarmKey) -> Result<(), AlarmError> {
        self.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> AlarmPayload {
        AlarmPayload {
            title: "t".into(),
            body: "b".into(),
        }
    }

    #[test]
    fn reregistering_replaces_instead_of_duplicating() {
        let alarms = InMemoryAlarms::new();
        let key = AlarmKey::dose("m1", 0);
        alarms.schedule_repeating(&key, 1_000, 86_400_000, &payload()).unwrap();
        alarms.schedule_repeating(&key, 2_000, 86_400_000, &payload()).unwrap();
        assert_eq!(alarms.len(), 1);
        assert_eq!(alarms.get(&key).unwrap().fire_at_ms, 2_000);
    }

    #[test]
    fn cancel_is_idempotent() {
        let alarms = InMemoryAlarms::new();
        let key = AlarmKey::appointment("a1");
        assert!(alarms.cancel(&key).is_ok());
        alarms.schedule_once(&key, 5, &payload()).unwrap();
        assert!(alarms.cancel(&key).is_ok());
        assert!(alarms.cancel(&key).is_ok());
        assert!(alarms.is_empty());
    }
}
