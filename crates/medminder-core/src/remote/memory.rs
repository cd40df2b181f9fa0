//! In-process backend for tests and offline runs.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use super::HealthBackend;
use crate::error::RemoteError;
use crate::model::{appointment, Appointment, AppointmentStatus, Medicine, Session, User, UserProfile};

#[derive(Default)]
struct State {
    accounts: HashMap<String, (String, User)>,
    session: Option<User>,
    medicines: BTreeMap<String, Medicine>,
    appointments: BTreeMap<String, Appointment>,
    profiles: HashMap<String, UserProfile>,
    failing: HashSet<&'static str>,
    calls: HashMap<&'static str, usize>,
}

/// [`HealthBackend`] kept entirely in memory.
///
/// Operations can be made to fail by name (`"get_medicines"`, ...) and calls
/// are counted per operation.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Count the call and fail it when `op` is marked failing.
    fn enter(&self, op: &'static str) -> Result<MutexGuard<'_, State>, RemoteError> {
        let mut state = self.lock();
        *state.calls.entry(op).or_default() += 1;
        if state.failing.contains(op) {
            return Err(RemoteError::Status {
                status: 503,
                message: format!("{op} unavailable"),
            });
        }
        Ok(state)
    }

    pub fn add_account(&self, email: &str, password: &str, user_id: &str) {
        let user = User {
            id: user_id.to_string(),
            email: email.to_string(),
        };
        self.lock()
            .accounts
            .insert(email.to_string(), (password.to_string(), user));
    }

    /// Mark the session as belonging to `user_id` without a sign-in.
    pub fn resume_session(&self, user_id: &str) {
        let mut state = self.lock();
        let user = state
            .accounts
            .values()
            .map(|(_, u)| u.clone())
            .find(|u| u.id == user_id)
            .unwrap_or_else(|| User {
                id: user_id.to_string(),
                email: String::new(),
            });
        state.session = Some(user);
    }

    pub fn set_profile_prefs(&self, user_id: &str, enabled: bool, reminder_minutes: u32) {
        let mut state = self.lock();
        let profile = state
            .profiles
            .entry(user_id.to_string())
            .or_insert_with(|| {
                UserProfile::for_user(&User {
                    id: user_id.to_string(),
                    email: String::new(),
                })
            });
        profile.notifications_enabled = enabled;
        profile.reminder_minutes = reminder_minutes;
    }

    pub fn profile(&self, user_id: &str) -> Option<UserProfile> {
        self.lock().profiles.get(user_id).cloned()
    }

    pub fn insert_medicine(&self, medicine: Medicine) {
        self.lock().medicines.insert(medicine.id.clone(), medicine);
    }

    pub fn insert_appointment(&self, appointment: Appointment) {
        self.lock()
            .appointments
            .insert(appointment.id.clone(), appointment);
    }

    pub fn medicine(&self, id: &str) -> Option<Medicine> {
        self.lock().medicines.get(id).cloned()
    }

    pub fn appointment(&self, id: &str) -> Option<Appointment> {
        self.lock().appointments.get(id).cloned()
    }

    pub fn fail(&self, op: &'static str) {
        self.lock().failing.insert(op);
    }

    pub fn recover(&self, op: &'static str) {
        self.lock().failing.remove(op);
    }

    pub fn calls(&self, op: &str) -> usize {
        self.lock().calls.get(op).copied().unwrap_or(0)
    }
}

#[async_trait]
impl HealthBackend for MemoryBackend {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, RemoteError> {
        let mut state = self.enter("sign_in")?;
        let user = match state.accounts.get(email) {
            Some((pw, user)) if pw == password => user.clone(),
            _ => {
                return Err(RemoteError::Status {
                    status: 400,
                    message: "Invalid login credentials".into(),
                })
            }
        };
        state.session = Some(user.clone());
        Ok(Session {
            access_token: format!("token-{}", user.id),
            refresh_token: None,
            user,
        })
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, RemoteError> {
        let mut state = self.enter("sign_up")?;
        if state.accounts.contains_key(email) {
            return Err(RemoteError::Status {
                status: 422,
                message: "User already registered".into(),
            });
        }
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
        };
        state
            .accounts
            .insert(email.to_string(), (password.to_string(), user.clone()));
        state.session = Some(user.clone());
        Ok(Session {
            access_token: format!("token-{}", user.id),
            refresh_token: None,
            user,
        })
    }

    async fn sign_out(&self) -> Result<(), RemoteError> {
        let mut state = self.enter("sign_out")?;
        state.session = None;
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<User>, RemoteError> {
        Ok(self.enter("current_user")?.session.clone())
    }

    async fn get_medicines(&self, user_id: &str) -> Result<Vec<Medicine>, RemoteError> {
        Ok(self
            .enter("get_medicines")?
            .medicines
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_active_medicines(&self, user_id: &str) -> Result<Vec<Medicine>, RemoteError> {
        Ok(self
            .enter("get_active_medicines")?
            .medicines
            .values()
            .filter(|m| m.user_id == user_id && m.is_active)
            .cloned()
            .collect())
    }

    async fn add_medicine(&self, medicine: &Medicine) -> Result<Medicine, RemoteError> {
        let mut state = self.enter("add_medicine")?;
        state.medicines.insert(medicine.id.clone(), medicine.clone());
        Ok(medicine.clone())
    }

    async fn update_medicine(&self, medicine: &Medicine) -> Result<Medicine, RemoteError> {
        let mut state = self.enter("update_medicine")?;
        let slot = state
            .medicines
            .get_mut(&medicine.id)
            .ok_or_else(|| RemoteError::NotFound {
                entity: "medicine",
                id: medicine.id.clone(),
            })?;
        *slot = medicine.clone();
        Ok(medicine.clone())
    }

    async fn delete_medicine(&self, medicine_id: &str) -> Result<(), RemoteError> {
        self.enter("delete_medicine")?.medicines.remove(medicine_id);
        Ok(())
    }

    async fn get_appointments(&self, user_id: &str) -> Result<Vec<Appointment>, RemoteError> {
        let mut mine: Vec<_> = self
            .enter("get_appointments")?
            .appointments
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        mine.sort_by(|a, b| (&a.date, &a.time).cmp(&(&b.date, &b.time)));
        Ok(mine)
    }

    async fn get_upcoming_appointments(
        &self,
        user_id: &str,
        from: NaiveDate,
    ) -> Result<Vec<Appointment>, RemoteError> {
        let state = self.enter("get_upcoming_appointments")?;
        let mine: Vec<_> = state
            .appointments
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        Ok(appointment::upcoming(&mine, from))
    }

    async fn add_appointment(&self, appointment: &Appointment) -> Result<Appointment, RemoteError> {
        let mut state = self.enter("add_appointment")?;
        state
            .appointments
            .insert(appointment.id.clone(), appointment.clone());
        Ok(appointment.clone())
    }

    async fn update_appointment(
        &self,
        appointment: &Appointment,
    ) -> Result<Appointment, RemoteError> {
        let mut state = self.enter("update_appointment")?;
        let slot = state
            .appointments
            .get_mut(&appointment.id)
            .ok_or_else(|| RemoteError::NotFound {
                entity: "appointment",
                id: appointment.id.clone(),
            })?;
        *slot = appointment.clone();
        Ok(appointment.clone())
    }

    async fn update_appointment_status(
        &self,
        appointment_id: &str,
        status: AppointmentStatus,
    ) -> Result<Appointment, RemoteError> {
        let mut state = self.enter("update_appointment_status")?;
        let slot = state
            .appointments
            .get_mut(appointment_id)
            .ok_or_else(|| RemoteError::NotFound {
                entity: "appointment",
                id: appointment_id.to_string(),
            })?;
        slot.status = status;
        Ok(slot.clone())
    }

    async fn delete_appointment(&self, appointment_id: &str) -> Result<(), RemoteError> {
        self.enter("delete_appointment")?
            .appointments
            .remove(appointment_id);
        Ok(())
    }

    async fn get_profile(&self, user_id: &str) -> Result<UserProfile, RemoteError> {
        self.enter("get_profile")?
            .profiles
            .get(user_id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound {
                entity: "profile",
                id: user_id.to_string(),
            })
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> Result<UserProfile, RemoteError> {
        self.enter("upsert_profile")?
            .profiles
            .insert(profile.id.clone(), profile.clone());
        Ok(profile.clone())
    }
}
