//! Alarm lifecycle for medicines and appointments.
//!
//! ## Lifecycle
//!
//! ```text
//! Medicine:    {none} --schedule(all slots)--> {active} --cancel(slot count)--> {none}
//! Appointment: {none} --schedule(start - lead)--> {active} --cancel--> {none}
//! ```
//!
//! Dose alarms repeat daily. The first fire is today's slot time, or the same
//! time tomorrow when today's has already passed. Appointment alarms fire once
//! and are skipped when the reminder time is already in the past.

use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::key::AlarmKey;
use super::scheduler::{AlarmPayload, AlarmScheduler};
use crate::clock::Clock;
use crate::error::AlarmError;
use crate::model::{Appointment, Medicine};
use crate::prefs::PreferenceStore;
use crate::schedule::parse_clock;

/// Interval of a dose alarm.
pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// What a schedule call did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScheduleOutcome {
    /// `count` alarms registered.
    Scheduled { count: usize },
    /// Reminder time already passed; nothing registered.
    SkippedPast { fire_at: NaiveDateTime },
    /// Entity is inactive, not scheduled, or has no dose times.
    SkippedInactive,
}

impl ScheduleOutcome {
    pub fn scheduled_count(&self) -> usize {
        match self {
            ScheduleOutcome::Scheduled { count } => *count,
            _ => 0,
        }
    }
}

/// Registers and cancels alarms on an [`AlarmScheduler`].
#[derive(Clone)]
pub struct AlarmManager {
    scheduler: Arc<dyn AlarmScheduler>,
    prefs: Arc<dyn PreferenceStore>,
    clock: Arc<dyn Clock>,
}

impl AlarmManager {
    pub fn new(
        scheduler: Arc<dyn AlarmScheduler>,
        prefs: Arc<dyn PreferenceStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            scheduler,
            prefs,
            clock,
        }
    }

    fn now_local(&self) -> NaiveDateTime {
        self.clock.now().naive_local()
    }

    // ── Medicines ────────────────────────────────────────────────────

    /// Register one daily alarm per dose time.
    ///
    /// All times are parsed before anything is registered, so an invalid
    /// time leaves no partial set behind. When the scheduler refuses a slot,
    /// the slots already registered are cancelled again.
    pub fn schedule_medicine(&self, medicine: &Medicine) -> Result<ScheduleOutcome, AlarmError> {
        if !medicine.wants_alarms() {
            tracing::debug!(medicine_id = %medicine.id, "medicine inactive or without times, not scheduling");
            return Ok(ScheduleOutcome::SkippedInactive);
        }

        let times = medicine
            .times
            .iter()
            .map(|t| {
                parse_clock(t).ok_or_else(|| AlarmError::InvalidTime {
                    field: "dose time",
                    value: t.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let now = self.now_local();
        let payload = medicine_payload(medicine);
        for (slot, time) in times.iter().enumerate() {
            let first = next_daily_fire(now, *time);
            let key = AlarmKey::dose(&medicine.id, slot);
            if let Err(e) = self.scheduler.schedule_repeating(
                &key,
                self.clock.local_to_epoch_ms(first),
                DAY_MS,
                &payload,
            ) {
                tracing::warn!(%key, error = %e, "dose alarm refused, rolling back earlier slots");
                if let Err(rollback) = self.cancel_medicine(&medicine.id, slot) {
                    tracing::warn!(medicine_id = %medicine.id, error = %rollback, "rollback incomplete");
                }
                return Err(e);
            }
            tracing::debug!(%key, first_fire = %first, "dose alarm registered");
        }

        tracing::info!(
            medicine_id = %medicine.id,
            slots = times.len(),
            "scheduled medicine reminders"
        );
        Ok(ScheduleOutcome::Scheduled { count: times.len() })
    }

    /// Cancel slots `0..slot_count` of a medicine.
    ///
    /// Every slot is attempted; the first failure is returned afterwards.
    pub fn cancel_medicine(&self, medicine_id: &str, slot_count: usize) -> Result<(), AlarmError> {
        let mut first_err = None;
        for slot in 0..slot_count {
            let key = AlarmKey::dose(medicine_id, slot);
            if let Err(e) = self.scheduler.cancel(&key) {
                tracing::warn!(%key, error = %e, "failed to cancel dose alarm");
                first_err.get_or_insert(e);
            }
        }
        tracing::info!(medicine_id, slots = slot_count, "cancelled medicine reminders");
        first_err.map_or(Ok(()), Err)
    }

    /// Replace a medicine's alarms after an edit.
    ///
    /// `previous_slots` is the slot count before the edit; it may differ from
    /// the new one when the frequency changed. A failed cancel is logged and
    /// the new times are still registered.
    pub fn reschedule_medicine(
        &self,
        medicine: &Medicine,
        previous_slots: usize,
    ) -> Result<ScheduleOutcome, AlarmError> {
        let slots = previous_slots.max(medicine.slot_count());
        if let Err(e) = self.cancel_medicine(&medicine.id, slots) {
            tracing::warn!(medicine_id = %medicine.id, error = %e, "old dose alarms not fully cancelled");
        }
        self.schedule_medicine(medicine)
    }

    // ── Appointments ─────────────────────────────────────────────────

    /// Register a one-shot reminder `reminder_minutes` before the appointment.
    pub fn schedule_appointment(
        &self,
        appointment: &Appointment,
    ) -> Result<ScheduleOutcome, AlarmError> {
        if !appointment.is_scheduled() {
            tracing::debug!(
                appointment_id = %appointment.id,
                status = %appointment.status,
                "appointment not scheduled, no reminder"
            );
            return Ok(ScheduleOutcome::SkippedInactive);
        }

        let lead = Duration::minutes(i64::from(self.prefs.reminder_minutes()));
        let fire_at = appointment.starts_at()? - lead;
        if fire_at <= self.now_local() {
            tracing::info!(
                appointment_id = %appointment.id,
                %fire_at,
                "reminder time already passed, skipping"
            );
            return Ok(ScheduleOutcome::SkippedPast { fire_at });
        }

        let key = AlarmKey::appointment(&appointment.id);
        self.scheduler.schedule_once(
            &key,
            self.clock.local_to_epoch_ms(fire_at),
            &appointment_payload(appointment),
        )?;
        tracing::info!(%key, %fire_at, "scheduled appointment reminder");
        Ok(ScheduleOutcome::Scheduled { count: 1 })
    }

    pub fn cancel_appointment(&self, appointment_id: &str) -> Result<(), AlarmError> {
        self.scheduler.cancel(&AlarmKey::appointment(appointment_id))?;
        tracing::info!(appointment_id, "cancelled appointment reminder");
        Ok(())
    }

    /// Cancel then re-register an edited appointment.
    pub fn reschedule_appointment(
        &self,
        appointment: &Appointment,
    ) -> Result<ScheduleOutcome, AlarmError> {
        self.cancel_appointment(&appointment.id)?;
        self.schedule_appointment(appointment)
    }
}

/// Today's occurrence of `time` if still ahead of `now`, otherwise tomorrow's.
pub fn next_daily_fire(now: NaiveDateTime, time: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(time);
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

fn medicine_payload(medicine: &Medicine) -> AlarmPayload {
    AlarmPayload {
        title: "Medicine Reminder".into(),
        body: format!("Time to take {} ({})", medicine.name, medicine.dosage),
    }
}

fn appointment_payload(appointment: &Appointment) -> AlarmPayload {
    let who = if appointment.specialty.is_empty() {
        appointment.doctor_name.clone()
    } else {
        format!("{} ({})", appointment.doctor_name, appointment.specialty)
    };
    let body = if appointment.location.is_empty() {
        format!("{who} at {}", appointment.time)
    } else {
        format!("{who} at {} - {}", appointment.time, appointment.location)
    };
    AlarmPayload {
        title: "Appointment Reminder".into(),
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::InMemoryAlarms;
    use crate::clock::FixedClock;
    use crate::model::AppointmentStatus;
    use crate::prefs::{MemoryPreferences, NotificationPreferences};
    use chrono::NaiveDate;

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .unwrap()
            .and_time(parse_clock(time).unwrap())
    }

    fn setup(now: NaiveDateTime) -> (AlarmManager, Arc<InMemoryAlarms>, FixedClock) {
        let alarms = Arc::new(InMemoryAlarms::new());
        let clock = FixedClock::at(now, 0).unwrap();
        let prefs = Arc::new(MemoryPreferences::signed_in(
            "u1",
            NotificationPreferences::default(),
        ));
        let manager = AlarmManager::new(alarms.clone(), prefs, Arc::new(clock));
        (manager, alarms, clock)
    }

    fn medicine(times: &[&str]) -> Medicine {
        Medicine {
            id: "m1".into(),
            user_id: "u1".into(),
            name: "Aspirin".into(),
            dosage: "100mg".into(),
            frequency: "8".into(),
            times: times.iter().map(|t| t.to_string()).collect(),
            is_active: true,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: None,
            notes: None,
            created_at: None,
        }
    }

    fn appointment(date: &str, time: &str) -> Appointment {
        Appointment {
            id: "a1".into(),
            user_id: "u1".into(),
            doctor_name: "Dr. Lee".into(),
            specialty: "Cardiology".into(),
            date: date.into(),
            time: time.into(),
            location: "Clinic".into(),
            status: AppointmentStatus::Scheduled,
            notes: None,
        }
    }

    #[test]
    fn dose_alarms_roll_passed_slots_to_tomorrow() {
        let (manager, alarms, clock) = setup(at("2024-01-01", "12:00"));
        let outcome = manager
            .schedule_medicine(&medicine(&["08:00", "16:00", "00:00"]))
            .unwrap();
        assert_eq!(outcome, ScheduleOutcome::Scheduled { count: 3 });

        let expect = |slot: usize, when: NaiveDateTime| {
            let alarm = alarms.get(&AlarmKey::dose("m1", slot)).unwrap();
            assert_eq!(alarm.fire_at_ms, clock.local_to_epoch_ms(when));
            assert_eq!(alarm.interval_ms, Some(DAY_MS));
        };
        expect(0, at("2024-01-02", "08:00"));
        expect(1, at("2024-01-01", "16:00"));
        expect(2, at("2024-01-02", "00:00"));
    }

    #[test]
    fn slot_at_exactly_now_goes_to_tomorrow() {
        let now = at("2024-01-01", "08:00");
        assert_eq!(next_daily_fire(now, parse_clock("08:00").unwrap()), at("2024-01-02", "08:00"));
    }

    #[test]
    fn inactive_medicine_registers_nothing() {
        let (manager, alarms, _) = setup(at("2024-01-01", "12:00"));
        let mut med = medicine(&["08:00"]);
        med.is_active = false;
        assert_eq!(manager.schedule_medicine(&med).unwrap(), ScheduleOutcome::SkippedInactive);
        assert!(alarms.is_empty());
    }

    #[test]
    fn invalid_dose_time_registers_nothing() {
        let (manager, alarms, _) = setup(at("2024-01-01", "12:00"));
        let err = manager.schedule_medicine(&medicine(&["08:00", "25:99"])).unwrap_err();
        assert!(matches!(err, AlarmError::InvalidTime { .. }));
        assert!(alarms.is_empty());
    }

    #[test]
    fn cancel_medicine_clears_all_slots_and_is_idempotent() {
        let (manager, alarms, _) = setup(at("2024-01-01", "12:00"));
        let med = medicine(&["08:00", "16:00", "00:00"]);
        manager.schedule_medicine(&med).unwrap();
        manager.cancel_medicine("m1", 3).unwrap();
        assert!(alarms.for_entity("m1").is_empty());
        manager.cancel_medicine("m1", 3).unwrap();
    }

    #[test]
    fn reschedule_drops_slots_no_longer_used() {
        let (manager, alarms, _) = setup(at("2024-01-01", "12:00"));
        let mut med = medicine(&["08:00", "16:00", "00:00"]);
        manager.schedule_medicine(&med).unwrap();

        med.reschedule(Some("24"), Some("09:00"));
        manager.reschedule_medicine(&med, 3).unwrap();

        let keys: Vec<_> = alarms.for_entity("m1").into_iter().map(|a| a.key).collect();
        assert_eq!(keys, vec![AlarmKey::dose("m1", 0)]);
    }

    #[test]
    fn appointment_reminder_fires_before_start() {
        let (manager, alarms, clock) = setup(at("2024-01-01", "08:00"));
        let outcome = manager.schedule_appointment(&appointment("2024-01-01", "10:00")).unwrap();
        assert_eq!(outcome, ScheduleOutcome::Scheduled { count: 1 });

        let alarm = alarms.get(&AlarmKey::appointment("a1")).unwrap();
        assert_eq!(alarm.fire_at_ms, clock.local_to_epoch_ms(at("2024-01-01", "09:45")));
        assert_eq!(alarm.interval_ms, None);
        assert_eq!(alarm.payload.body, "Dr. Lee (Cardiology) at 10:00 - Clinic");
    }

    #[test]
    fn appointment_reminder_in_the_past_is_skipped() {
        let (manager, alarms, _) = setup(at("2024-01-01", "09:50"));
        let outcome = manager.schedule_appointment(&appointment("2024-01-01", "10:00")).unwrap();
        assert_eq!(
            outcome,
            ScheduleOutcome::SkippedPast {
                fire_at: at("2024-01-01", "09:45")
            }
        );
        assert!(alarms.is_empty());
    }

    #[test]
    fn terminal_appointment_is_not_scheduled() {
        let (manager, alarms, _) = setup(at("2024-01-01", "08:00"));
        let mut appt = appointment("2024-01-02", "10:00");
        appt.status = AppointmentStatus::Cancelled;
        assert_eq!(manager.schedule_appointment(&appt).unwrap(), ScheduleOutcome::SkippedInactive);
        assert!(alarms.is_empty());
    }

    #[test]
    fn cancel_unregistered_appointment_succeeds() {
        let (manager, _, _) = setup(at("2024-01-01", "08:00"));
        assert!(manager.cancel_appointment("never-scheduled").is_ok());
        assert!(manager.cancel_appointment("never-scheduled").is_ok());
    }

    /// Registry that refuses one key on schedule, or every cancel.
    struct Refusing {
        inner: InMemoryAlarms,
        refuse_schedule: Option<AlarmKey>,
        refuse_cancel: bool,
    }

    impl Refusing {
        fn check(&self, key: &AlarmKey) -> Result<(), AlarmError> {
            if self.refuse_schedule.as_ref() == Some(key) {
                return Err(AlarmError::PermissionDenied("exact alarms not permitted".into()));
            }
            Ok(())
        }
    }

    impl AlarmScheduler for Refusing {
        fn schedule_repeating(
            &self,
            key: &AlarmKey,
            first_fire_ms: i64,
            interval_ms: i64,
            payload: &AlarmPayload,
        ) -> Result<(), AlarmError> {
            self.check(key)?;
            self.inner.schedule_repeating(key, first_fire_ms, interval_ms, payload)
        }

        fn schedule_once(&self, key: &AlarmKey, fire_ms: i64, payload: &AlarmPayload) -> Result<(), AlarmError> {
            self.check(key)?;
            self.inner.schedule_once(key, fire_ms, payload)
        }

        fn cancel(&self, key: &AlarmKey) -> Result<(), AlarmError> {
            if self.refuse_cancel {
                return Err(AlarmError::Registry("registry offline".into()));
            }
            self.inner.cancel(key)
        }
    }

    fn refusing_manager(registry: Arc<Refusing>) -> AlarmManager {
        let clock = FixedClock::at(at("2024-01-01", "12:00"), 0).unwrap();
        let prefs = Arc::new(MemoryPreferences::signed_in(
            "u1",
            NotificationPreferences::default(),
        ));
        AlarmManager::new(registry, prefs, Arc::new(clock))
    }

    #[test]
    fn refused_slot_rolls_back_earlier_slots() {
        let registry = Arc::new(Refusing {
            inner: InMemoryAlarms::new(),
            refuse_schedule: Some(AlarmKey::dose("m1", 2)),
            refuse_cancel: false,
        });
        let manager = refusing_manager(registry.clone());

        let err = manager
            .schedule_medicine(&medicine(&["08:00", "16:00", "00:00"]))
            .unwrap_err();
        assert!(matches!(err, AlarmError::PermissionDenied(_)));
        assert!(registry.inner.for_entity("m1").is_empty());
    }

    #[test]
    fn reschedule_registers_new_times_when_cancel_fails() {
        let registry = Arc::new(Refusing {
            inner: InMemoryAlarms::new(),
            refuse_schedule: None,
            refuse_cancel: true,
        });
        let manager = refusing_manager(registry.clone());

        let mut med = medicine(&["08:00", "16:00", "00:00"]);
        med.reschedule(Some("12"), Some("09:00"));
        let outcome = manager.reschedule_medicine(&med, 3).unwrap();

        assert_eq!(outcome, ScheduleOutcome::Scheduled { count: 2 });
        let slot0 = registry.inner.get(&AlarmKey::dose("m1", 0)).unwrap();
        let clock = FixedClock::at(at("2024-01-01", "12:00"), 0).unwrap();
        assert_eq!(slot0.fire_at_ms, clock.local_to_epoch_ms(at("2024-01-02", "09:00")));
    }
}
