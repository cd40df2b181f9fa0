//! Appointment list, status changes and reminder upkeep.

use chrono::NaiveDate;
use std::sync::Arc;

use crate::alarm::AlarmManager;
use crate::clock::Clock;
use crate::error::{AlarmError, RemoteError, Result};
use crate::model::{appointment, Appointment, AppointmentDraft, AppointmentStatus};
use crate::prefs::PreferenceStore;
use crate::remote::{HealthBackend, Resource};

pub struct AppointmentViewModel {
    backend: Arc<dyn HealthBackend>,
    alarms: AlarmManager,
    prefs: Arc<dyn PreferenceStore>,
    clock: Arc<dyn Clock>,
    appointments: Resource<Vec<Appointment>>,
}

impl AppointmentViewModel {
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
            appointments: Resource::Loading,
        }
    }

    pub fn appointments(&self) -> &Resource<Vec<Appointment>> {
        &self.appointments
    }

    pub async fn load(&mut self) -> &Resource<Vec<Appointment>> {
        self.appointments = Resource::Loading;
        self.appointments = match self.user_id() {
            Ok(user_id) => self.backend.get_appointments(&user_id).await.into(),
            Err(e) => Resource::Error(e.to_string()),
        };
        &self.appointments
    }

    // ── Filters over the loaded list ─────────────────────────────────

    pub fn on_date(&self, date: NaiveDate) -> Vec<Appointment> {
        appointment::on_date(self.loaded(), date)
    }

    pub fn with_status(&self, status: AppointmentStatus) -> Vec<Appointment> {
        appointment::with_status(self.loaded(), status)
    }

    pub fn upcoming(&self) -> Vec<Appointment> {
        appointment::upcoming(self.loaded(), self.today())
    }

    pub fn past(&self) -> Vec<Appointment> {
        appointment::past(self.loaded(), self.today())
    }

    // ── Mutations ────────────────────────────────────────────────────

    pub async fn add(&mut self, draft: AppointmentDraft) -> Result<Appointment> {
        draft.validate()?;
        let user_id = self.user_id()?;
        let appt = draft.into_appointment(uuid::Uuid::new_v4().to_string(), user_id);

        let saved = self.backend.add_appointment(&appt).await?;
        tracing::info!(appointment_id = %saved.id, date = %saved.date, time = %saved.time, "appointment added");
        log_alarm_failure(&saved.id, self.alarms.schedule_appointment(&saved).map(drop));

        if let Some(list) = self.appointments.data_mut() {
            list.push(saved.clone());
        }
        Ok(saved)
    }

    /// Edit the details. A scheduled appointment gets its reminder moved.
    pub async fn update(&mut self, appointment_id: &str, draft: AppointmentDraft) -> Result<Appointment> {
        draft.validate()?;
        let mut appt = self.find(appointment_id)?;
        draft.apply_to(&mut appt);

        let saved = self.backend.update_appointment(&appt).await?;
        log_alarm_failure(&saved.id, self.alarms.reschedule_appointment(&saved).map(drop));

        self.replace(saved.clone());
        Ok(saved)
    }

    pub async fn cancel(&mut self, appointment_id: &str) -> Result<Appointment> {
        self.finish(appointment_id, AppointmentStatus::Cancelled).await
    }

    pub async fn complete(&mut self, appointment_id: &str) -> Result<Appointment> {
        self.finish(appointment_id, AppointmentStatus::Completed).await
    }

    pub async fn delete(&mut self, appointment_id: &str) -> Result<()> {
        self.backend.delete_appointment(appointment_id).await?;
        log_alarm_failure(appointment_id, self.alarms.cancel_appointment(appointment_id));
        tracing::info!(appointment_id, "appointment deleted");

        if let Some(list) = self.appointments.data_mut() {
            list.retain(|a| a.id != appointment_id);
        }
        Ok(())
    }

    /// Move to a terminal status and drop the reminder.
    async fn finish(&mut self, appointment_id: &str, status: AppointmentStatus) -> Result<Appointment> {
        let mut appt = self.find(appointment_id)?;
        appt.transition(status)?;

        let saved = self
            .backend
            .update_appointment_status(appointment_id, status)
            .await?;
        log_alarm_failure(appointment_id, self.alarms.cancel_appointment(appointment_id));
        tracing::info!(appointment_id, %status, "appointment closed");

        self.replace(saved.clone());
        Ok(saved)
    }

    fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    fn loaded(&self) -> &[Appointment] {
        self.appointments.data().map(Vec::as_slice).unwrap_or(&[])
    }

    fn user_id(&self) -> Result<String, RemoteError> {
        self.prefs.user_id().ok_or(RemoteError::AuthRequired)
    }

    fn find(&self, appointment_id: &str) -> Result<Appointment, RemoteError> {
        self.loaded()
            .iter()
            .find(|a| a.id == appointment_id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound {
                entity: "appointment",
                id: appointment_id.to_string(),
            })
    }

    fn replace(&mut self, appt: Appointment) {
        if let Some(slot) = self
            .appointments
            .data_mut()
            .and_then(|list| list.iter_mut().find(|a| a.id == appt.id))
        {
            *slot = appt;
        }
    }
}

fn log_alarm_failure(appointment_id: &str, result: Result<(), AlarmError>) {
    if let Err(e) = result {
        tracing::error!(appointment_id, error = %e, "appointment alarm update failed");
    }
}
