//! Integration tests for the no-orphan alarm invariant.
//!
//! Drives the medicine and appointment state holders against the in-memory
//! backend and the SQLite alarm registry, checking after each lifecycle step
//! that alarms exist only for active medicines and scheduled appointments.

use std::sync::Arc;

use chrono::NaiveDate;
use medminder_core::{
    AlarmDb, AlarmManager, AppointmentDraft, AppointmentViewModel, Clock, FixedClock, MedicineDraft,
    MedicineViewModel, MemoryBackend, MemoryPreferences, NotificationPreferences, PreferenceStore,
};

struct App {
    medicines: MedicineViewModel,
    appointments: AppointmentViewModel,
    alarms: Arc<AlarmDb>,
    _dir: tempfile::TempDir,
}

async fn app() -> App {
    let dir = tempfile::tempdir().unwrap();
    let alarms = Arc::new(AlarmDb::open_at(&dir.path().join("alarms.db")).unwrap());
    let backend = Arc::new(MemoryBackend::new());
    let prefs: Arc<dyn PreferenceStore> = Arc::new(MemoryPreferences::signed_in(
        "u1",
        NotificationPreferences::default(),
    ));
    let now = NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    let clock: Arc<dyn Clock> = Arc::new(FixedClock::at(now, 2).unwrap());
    let manager = AlarmManager::new(alarms.clone(), prefs.clone(), clock.clone());

    let mut medicines =
        MedicineViewModel::new(backend.clone(), manager.clone(), prefs.clone(), clock.clone());
    let mut appointments = AppointmentViewModel::new(backend, manager, prefs, clock);
    medicines.load().await;
    appointments.load().await;
    App {
        medicines,
        appointments,
        alarms,
        _dir: dir,
    }
}

fn medicine(frequency: &str) -> MedicineDraft {
    MedicineDraft {
        name: "Metformin".into(),
        dosage: "500mg".into(),
        frequency: frequency.into(),
        start_time: "07:00".into(),
        ..Default::default()
    }
}

fn appointment(date: &str) -> AppointmentDraft {
    AppointmentDraft {
        doctor_name: "Dr. Okafor".into(),
        specialty: "Endocrinology".into(),
        date: date.into(),
        time: "14:30".into(),
        location: "Room 4".into(),
        notes: None,
    }
}

#[tokio::test]
async fn medicine_lifecycle_leaves_no_orphans() {
    let mut app = app().await;
    let med = app.medicines.add(medicine("6")).await.unwrap();
    assert_eq!(app.alarms.for_entity(&med.id).unwrap().len(), 4);

    app.medicines.update(&med.id, medicine("12")).await.unwrap();
    assert_eq!(app.alarms.for_entity(&med.id).unwrap().len(), 2);

    app.medicines.set_active(&med.id, false).await.unwrap();
    assert!(app.alarms.for_entity(&med.id).unwrap().is_empty());

    // Editing an inactive medicine must not bring its alarms back.
    app.medicines.update(&med.id, medicine("8")).await.unwrap();
    assert!(app.alarms.for_entity(&med.id).unwrap().is_empty());

    app.medicines.set_active(&med.id, true).await.unwrap();
    assert_eq!(app.alarms.for_entity(&med.id).unwrap().len(), 3);

    app.medicines.delete(&med.id).await.unwrap();
    assert_eq!(app.alarms.count().unwrap(), 0);
}

#[tokio::test]
async fn appointment_lifecycle_leaves_no_orphans() {
    let mut app = app().await;
    let cancelled = app.appointments.add(appointment("2024-06-03")).await.unwrap();
    let completed = app.appointments.add(appointment("2024-06-04")).await.unwrap();
    let deleted = app.appointments.add(appointment("2024-06-05")).await.unwrap();
    assert_eq!(app.alarms.count().unwrap(), 3);

    app.appointments.cancel(&cancelled.id).await.unwrap();
    app.appointments.complete(&completed.id).await.unwrap();
    app.appointments.delete(&deleted.id).await.unwrap();
    assert_eq!(app.alarms.count().unwrap(), 0);

    // A closed appointment stays without a reminder even when edited.
    app.appointments
        .update(&cancelled.id, appointment("2024-06-10"))
        .await
        .unwrap();
    assert_eq!(app.alarms.count().unwrap(), 0);
}

#[tokio::test]
async fn every_registered_alarm_belongs_to_a_live_entity() {
    let mut app = app().await;
    let keep = app.medicines.add(medicine("24")).await.unwrap();
    let gone = app.medicines.add(medicine("8")).await.unwrap();
    let appt = app.appointments.add(appointment("2024-06-02")).await.unwrap();
    app.medicines.set_active(&gone.id, false).await.unwrap();

    let owners: Vec<String> = app
        .alarms
        .list()
        .unwrap()
        .into_iter()
        .map(|a| a.key.entity_id().to_string())
        .collect();
    assert_eq!(owners.len(), 2);
    assert!(owners.contains(&keep.id));
    assert!(owners.contains(&appt.id));
}
