//! Remote health backend.
//!
//! [`HealthBackend`] is the repository seam: state holders call it, it talks
//! to the hosted service, and results come back as [`Resource`] values for the
//! caller to render. [`SupabaseClient`] is the production implementation.

mod memory;
mod supabase;

pub use memory::MemoryBackend;
pub use supabase::SupabaseClient;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::RemoteError;
use crate::model::{Appointment, AppointmentStatus, Medicine, Session, User, UserProfile};

/// Tagged result of a remote operation, as seen by a caller rendering it.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource<T> {
    Loading,
    Success(T),
    Error(String),
}

impl<T> Resource<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Resource::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Resource::Success(v) => Some(v),
            _ => None,
        }
    }

    pub fn data_mut(&mut self) -> Option<&mut T> {
        match self {
            Resource::Success(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Resource::Error(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resource<U> {
        match self {
            Resource::Loading => Resource::Loading,
            Resource::Success(v) => Resource::Success(f(v)),
            Resource::Error(msg) => Resource::Error(msg),
        }
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for Resource<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(v) => Resource::Success(v),
            Err(e) => Resource::Error(e.to_string()),
        }
    }
}

/// CRUD and auth operations against the hosted backend.
#[async_trait]
pub trait HealthBackend: Send + Sync {
    // ── Auth ─────────────────────────────────────────────────────────

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, RemoteError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, RemoteError>;

    async fn sign_out(&self) -> Result<(), RemoteError>;

    /// The user owning the current session, if any.
    async fn current_user(&self) -> Result<Option<User>, RemoteError>;

    // ── Medicines ────────────────────────────────────────────────────

    async fn get_medicines(&self, user_id: &str) -> Result<Vec<Medicine>, RemoteError>;

    async fn get_active_medicines(&self, user_id: &str) -> Result<Vec<Medicine>, RemoteError> {
        Ok(self
            .get_medicines(user_id)
            .await?
            .into_iter()
            .filter(|m| m.is_active)
            .collect())
    }

    async fn add_medicine(&self, medicine: &Medicine) -> Result<Medicine, RemoteError>;

    async fn update_medicine(&self, medicine: &Medicine) -> Result<Medicine, RemoteError>;

    async fn delete_medicine(&self, medicine_id: &str) -> Result<(), RemoteError>;

    // ── Appointments ─────────────────────────────────────────────────

    async fn get_appointments(&self, user_id: &str) -> Result<Vec<Appointment>, RemoteError>;

    /// Scheduled appointments dated `from` or later, soonest first.
    async fn get_upcoming_appointments(
        &self,
        user_id: &str,
        from: NaiveDate,
    ) -> Result<Vec<Appointment>, RemoteError>;

    async fn add_appointment(&self, appointment: &Appointment) -> Result<Appointment, RemoteError>;

    async fn update_appointment(
        &self,
        appointment: &Appointment,
    ) -> Result<Appointment, RemoteError>;

    async fn update_appointment_status(
        &self,
        appointment_id: &str,
        status: AppointmentStatus,
    ) -> Result<Appointment, RemoteError>;

    async fn delete_appointment(&self, appointment_id: &str) -> Result<(), RemoteError>;

    // ── Profile ──────────────────────────────────────────────────────

    async fn get_profile(&self, user_id: &str) -> Result<UserProfile, RemoteError>;

    async fn upsert_profile(&self, profile: &UserProfile) -> Result<UserProfile, RemoteError>;
}

/// Access-token persistence in the OS keyring.
pub mod token_store {
    const SERVICE: &str = "medminder";
    const ACCESS_TOKEN: &str = "access_token";

    pub fn load() -> Result<Option<String>, keyring::Error> {
        match keyring::Entry::new(SERVICE, ACCESS_TOKEN)?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn save(token: &str) -> Result<(), keyring::Error> {
        keyring::Entry::new(SERVICE, ACCESS_TOKEN)?.set_password(token)
    }

    pub fn clear() -> Result<(), keyring::Error> {
        match keyring::Entry::new(SERVICE, ACCESS_TOKEN)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
