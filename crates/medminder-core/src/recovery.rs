//! Boot recovery.
//!
//! Alarm registrations do not survive a restart, so on boot every alarm is
//! re-derived from the remote medicine and appointment lists. Each entity is
//! handled in isolation: a failure is logged and counted, and the loop moves
//! on. A failed fetch of one collection does not stop the other.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::alarm::{AlarmManager, ScheduleOutcome};
use crate::clock::Clock;
use crate::prefs::PreferenceStore;
use crate::remote::HealthBackend;

/// What happened to a single entity during recovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RecoveryAction {
    Rescheduled {
        entity_id: String,
        alarms: usize,
    },
    Skipped {
        entity_id: String,
        reason: String,
    },
    Failed {
        entity_id: String,
        error: String,
    },
}

/// Why recovery did nothing at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoverySkip {
    NoUser,
    NotificationsDisabled,
}

/// Summary of a recovery run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped_run: Option<RecoverySkip>,
    pub medicines_rescheduled: usize,
    pub appointments_rescheduled: usize,
    pub skipped_count: usize,
    pub failed_count: usize,
    /// Collections whose fetch failed, with the error message.
    pub fetch_errors: Vec<(String, String)>,
    pub actions: Vec<RecoveryAction>,
}

impl RecoveryReport {
    fn skipped(reason: RecoverySkip) -> Self {
        Self {
            skipped_run: Some(reason),
            ..Default::default()
        }
    }

    /// True when every fetch and every entity succeeded or was skipped.
    pub fn is_complete(&self) -> bool {
        self.failed_count == 0 && self.fetch_errors.is_empty()
    }

    fn record(&mut self, entity_id: &str, result: Result<ScheduleOutcome, String>, medicine: bool) {
        let action = match result {
            Ok(ScheduleOutcome::Scheduled { count }) => {
                if medicine {
                    self.medicines_rescheduled += 1;
                } else {
                    self.appointments_rescheduled += 1;
                }
                RecoveryAction::Rescheduled {
                    entity_id: entity_id.to_string(),
                    alarms: count,
                }
            }
            Ok(ScheduleOutcome::SkippedPast { fire_at }) => {
                self.skipped_count += 1;
                RecoveryAction::Skipped {
                    entity_id: entity_id.to_string(),
                    reason: format!("reminder time {fire_at} already passed"),
                }
            }
            Ok(ScheduleOutcome::SkippedInactive) => {
                self.skipped_count += 1;
                RecoveryAction::Skipped {
                    entity_id: entity_id.to_string(),
                    reason: "inactive".into(),
                }
            }
            Err(error) => {
                self.failed_count += 1;
                RecoveryAction::Failed {
                    entity_id: entity_id.to_string(),
                    error,
                }
            }
        };
        self.actions.push(action);
    }
}

/// Re-registers all alarms for the cached user.
pub struct BootRecovery {
    backend: Arc<dyn HealthBackend>,
    alarms: AlarmManager,
    prefs: Arc<dyn PreferenceStore>,
    clock: Arc<dyn Clock>,
}

impl BootRecovery {
    pub fn new(
        backend: Arc<dyn HealthBackend>,
        alarms: AlarmManager,
        prefs: Arc<dyn PreferenceStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            backend,
            alarms,
            prefs,
            clock,
        }
    }

    pub async fn run(&self) -> RecoveryReport {
        let Some(user_id) = self.prefs.user_id() else {
            tracing::info!("no cached user, skipping alarm recovery");
            return RecoveryReport::skipped(RecoverySkip::NoUser);
        };
        if !self.prefs.notifications_enabled() {
            tracing::info!(%user_id, "notifications disabled, skipping alarm recovery");
            return RecoveryReport::skipped(RecoverySkip::NotificationsDisabled);
        }

        let mut report = RecoveryReport::default();

        match self.backend.get_active_medicines(&user_id).await {
            Ok(medicines) => {
                for medicine in &medicines {
                    let result = self
                        .alarms
                        .schedule_medicine(medicine)
                        .map_err(|e| e.to_string());
                    if let Err(e) = &result {
                        tracing::error!(medicine_id = %medicine.id, error = %e, "failed to restore medicine alarms");
                    }
                    report.record(&medicine.id, result, true);
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to fetch medicines for recovery");
                report.fetch_errors.push(("medicines".into(), e.to_string()));
            }
        }

        let today = self.clock.now().date_naive();
        match self.backend.get_upcoming_appointments(&user_id, today).await {
            Ok(appointments) => {
                for appointment in &appointments {
                    let result = self
                        .alarms
                        .schedule_appointment(appointment)
                        .map_err(|e| e.to_string());
                    if let Err(e) = &result {
                        tracing::error!(appointment_id = %appointment.id, error = %e, "failed to restore appointment alarm");
                    }
                    report.record(&appointment.id, result, false);
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to fetch appointments for recovery");
                report
                    .fetch_errors
                    .push(("appointments".into(), e.to_string()));
            }
        }

        tracing::info!(
            medicines = report.medicines_rescheduled,
            appointments = report.appointments_rescheduled,
            skipped = report.skipped_count,
            failed = report.failed_count,
            "alarm recovery finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::{AlarmKey, InMemoryAlarms};
    use crate::clock::FixedClock;
    use crate::model::{Appointment, AppointmentStatus, Medicine};
    use crate::prefs::{MemoryPreferences, NotificationPreferences};
    use crate::remote::MemoryBackend;
    use chrono::NaiveDate;

    fn medicine(id: &str, times: &[&str], active: bool) -> Medicine {
        Medicine {
            id: id.into(),
            user_id: "u1".into(),
            name: "Aspirin".into(),
            dosage: "100mg".into(),
            frequency: "8".into(),
            times: times.iter().map(|t| t.to_string()).collect(),
            is_active: active,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: None,
            notes: None,
            created_at: None,
        }
    }

    fn appointment(id: &str, date: &str) -> Appointment {
        Appointment {
            id: id.into(),
            user_id: "u1".into(),
            doctor_name: "Dr. Lee".into(),
            specialty: String::new(),
            date: date.into(),
            time: "10:00".into(),
            location: String::new(),
            status: AppointmentStatus::Scheduled,
            notes: None,
        }
    }

    struct Fixture {
        backend: Arc<MemoryBackend>,
        alarms: Arc<InMemoryAlarms>,
        recovery: BootRecovery,
    }

    fn fixture(prefs: MemoryPreferences) -> Fixture {
        let backend = Arc::new(MemoryBackend::new());
        let alarms = Arc::new(InMemoryAlarms::new());
        let prefs: Arc<dyn PreferenceStore> = Arc::new(prefs);
        let now = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::at(now, 0).unwrap());
        let manager = AlarmManager::new(alarms.clone(), prefs.clone(), clock.clone());
        let recovery = BootRecovery::new(backend.clone(), manager, prefs, clock);
        Fixture {
            backend,
            alarms,
            recovery,
        }
    }

    #[tokio::test]
    async fn no_cached_user_is_a_no_op() {
        let f = fixture(MemoryPreferences::new());
        f.backend.insert_medicine(medicine("m1", &["08:00"], true));
        let report = f.recovery.run().await;
        assert_eq!(report.skipped_run, Some(RecoverySkip::NoUser));
        assert_eq!(f.backend.calls("get_active_medicines"), 0);
        assert!(f.alarms.is_empty());
    }

    #[tokio::test]
    async fn disabled_notifications_is_a_no_op() {
        let prefs = MemoryPreferences::signed_in(
            "u1",
            NotificationPreferences {
                enabled: false,
                ..Default::default()
            },
        );
        let f = fixture(prefs);
        f.backend.insert_medicine(medicine("m1", &["08:00"], true));
        let report = f.recovery.run().await;
        assert_eq!(report.skipped_run, Some(RecoverySkip::NotificationsDisabled));
        assert!(f.alarms.is_empty());
    }

    #[tokio::test]
    async fn restores_active_medicines_and_future_appointments() {
        let f = fixture(MemoryPreferences::signed_in("u1", NotificationPreferences::default()));
        f.backend.insert_medicine(medicine("m1", &["08:00", "20:00"], true));
        f.backend.insert_medicine(medicine("m2", &["09:00"], false));
        f.backend.insert_appointment(appointment("a1", "2024-01-03"));
        f.backend.insert_appointment(appointment("a2", "2023-12-30"));

        let report = f.recovery.run().await;
        assert!(report.is_complete());
        assert_eq!(report.medicines_rescheduled, 1);
        assert_eq!(report.appointments_rescheduled, 1);
        assert_eq!(f.alarms.len(), 3);
        assert!(f.alarms.contains(&AlarmKey::appointment("a1")));
        assert!(f.alarms.for_entity("m2").is_empty());
    }

    #[tokio::test]
    async fn bad_medicine_does_not_stop_the_rest() {
        let f = fixture(MemoryPreferences::signed_in("u1", NotificationPreferences::default()));
        f.backend.insert_medicine(medicine("m1", &["08:00"], true));
        f.backend.insert_medicine(medicine("m2", &["nope"], true));
        f.backend.insert_medicine(medicine("m3", &["18:00"], true));

        let report = f.recovery.run().await;
        assert_eq!(report.medicines_rescheduled, 2);
        assert_eq!(report.failed_count, 1);
        assert!(report
            .actions
            .iter()
            .any(|a| matches!(a, RecoveryAction::Failed { entity_id, .. } if entity_id == "m2")));
    }

    #[tokio::test]
    async fn failed_medicine_fetch_still_restores_appointments() {
        let f = fixture(MemoryPreferences::signed_in("u1", NotificationPreferences::default()));
        f.backend.fail("get_active_medicines");
        f.backend.insert_appointment(appointment("a1", "2024-01-02"));

        let report = f.recovery.run().await;
        assert!(!report.is_complete());
        assert_eq!(report.fetch_errors.len(), 1);
        assert_eq!(report.fetch_errors[0].0, "medicines");
        assert_eq!(report.appointments_rescheduled, 1);
    }
}
