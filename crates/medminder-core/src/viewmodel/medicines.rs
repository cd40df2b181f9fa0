//! Medicine list and its mutations.
//!
//! Every write goes to the backend first. Alarm changes run only after the
//! write succeeded, and alarm failures are logged rather than returned: the
//! medicine row is the source of truth and boot recovery re-derives alarms.

use std::sync::Arc;

use crate::alarm::AlarmManager;
use crate::clock::Clock;
use crate::error::{AlarmError, RemoteError, Result};
use crate::model::{Medicine, MedicineDraft};
use crate::prefs::PreferenceStore;
use crate::remote::{HealthBackend, Resource};

pub struct MedicineViewModel {
    backend: Arc<dyn HealthBackend>,
    alarms: AlarmManager,
    prefs: Arc<dyn PreferenceStore>,
    clock: Arc<dyn Clock>,
    medicines: Resource<Vec<Medicine>>,
}

impl MedicineViewModel {
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
            medicines: Resource::Loading,
        }
    }

    pub fn medicines(&self) -> &Resource<Vec<Medicine>> {
        &self.medicines
    }

    /// Active medicines whose prescription window covers today.
    pub fn due_today(&self) -> Vec<Medicine> {
        let today = self.clock.now().date_naive();
        self.medicines
            .data()
            .map(|list| {
                list.iter()
                    .filter(|m| m.is_active && m.covers(today))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub async fn load(&mut self) -> &Resource<Vec<Medicine>> {
        self.medicines = Resource::Loading;
        self.medicines = match self.user_id() {
            Ok(user_id) => self.backend.get_medicines(&user_id).await.into(),
            Err(e) => Resource::Error(e.to_string()),
        };
        &self.medicines
    }

    /// Create a medicine from user input and schedule its dose alarms.
    pub async fn add(&mut self, draft: MedicineDraft) -> Result<Medicine> {
        draft.validate()?;
        let user_id = self.user_id()?;
        let today = self.clock.now().date_naive();
        let medicine = draft.into_medicine(uuid::Uuid::new_v4().to_string(), user_id, today);

        let saved = self.backend.add_medicine(&medicine).await?;
        tracing::info!(medicine_id = %saved.id, times = ?saved.times, "medicine added");
        log_alarm_failure(&saved.id, self.alarms.schedule_medicine(&saved).map(drop));

        if let Some(list) = self.medicines.data_mut() {
            list.push(saved.clone());
        }
        Ok(saved)
    }

    /// Apply an edit. Times are recomputed from the draft's frequency and
    /// start time; an empty start time keeps the current first dose.
    pub async fn update(&mut self, medicine_id: &str, draft: MedicineDraft) -> Result<Medicine> {
        draft.validate()?;
        let mut medicine = self.find(medicine_id)?;
        let previous_slots = medicine.slot_count();

        medicine.name = draft.name.trim().to_string();
        medicine.dosage = draft.dosage.trim().to_string();
        if let Some(start) = draft.start_date {
            medicine.start_date = start;
        }
        medicine.end_date = draft.end_date;
        medicine.notes = draft.notes.filter(|n| !n.trim().is_empty());
        let frequency = Some(draft.frequency.as_str()).filter(|f| !f.trim().is_empty());
        let start_time = Some(draft.start_time.as_str()).filter(|t| !t.trim().is_empty());
        medicine.reschedule(frequency, start_time);

        let saved = self.backend.update_medicine(&medicine).await?;
        let result = if saved.is_active {
            self.alarms
                .reschedule_medicine(&saved, previous_slots)
                .map(drop)
        } else {
            self.alarms
                .cancel_medicine(&saved.id, previous_slots.max(saved.slot_count()))
        };
        log_alarm_failure(&saved.id, result);

        self.replace(saved.clone());
        Ok(saved)
    }

    /// Activate or deactivate. Deactivating cancels every dose alarm;
    /// reactivating schedules them again.
    pub async fn set_active(&mut self, medicine_id: &str, active: bool) -> Result<Medicine> {
        let mut medicine = self.find(medicine_id)?;
        medicine.is_active = active;

        let saved = self.backend.update_medicine(&medicine).await?;
        let result = if saved.is_active {
            self.alarms.schedule_medicine(&saved).map(drop)
        } else {
            self.alarms.cancel_medicine(&saved.id, saved.slot_count())
        };
        log_alarm_failure(&saved.id, result);
        tracing::info!(medicine_id = %saved.id, active, "medicine activity changed");

        self.replace(saved.clone());
        Ok(saved)
    }

    /// Hard delete. The alarms are cancelled once the row is gone.
    pub async fn delete(&mut self, medicine_id: &str) -> Result<()> {
        let slots = self.find(medicine_id)?.slot_count();
        self.backend.delete_medicine(medicine_id).await?;
        log_alarm_failure(medicine_id, self.alarms.cancel_medicine(medicine_id, slots));
        tracing::info!(medicine_id, "medicine deleted");

        if let Some(list) = self.medicines.data_mut() {
            list.retain(|m| m.id != medicine_id);
        }
        Ok(())
    }

    fn user_id(&self) -> Result<String, RemoteError> {
        self.prefs.user_id().ok_or(RemoteError::AuthRequired)
    }

    fn find(&self, medicine_id: &str) -> Result<Medicine, RemoteError> {
        self.medicines
            .data()
            .and_then(|list| list.iter().find(|m| m.id == medicine_id))
            .cloned()
            .ok_or_else(|| RemoteError::NotFound {
                entity: "medicine",
                id: medicine_id.to_string(),
            })
    }

    fn replace(&mut self, medicine: Medicine) {
        if let Some(slot) = self
            .medicines
            .data_mut()
            .and_then(|list| list.iter_mut().find(|m| m.id == medicine.id))
        {
            *slot = medicine;
        }
    }
}

fn log_alarm_failure(medicine_id: &str, result: Result<(), AlarmError>) {
    if let Err(e) = result {
        tracing::error!(medicine_id, error = %e, "medicine alarm update failed");
    }
}
