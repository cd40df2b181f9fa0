//! Profile and notification settings.
//!
//! Notification settings are written to the server profile first and copied
//! into the local preference cache only after the write succeeds.

use chrono::NaiveDate;
use std::sync::Arc;

use crate::error::{RemoteError, Result};
use crate::model::UserProfile;
use crate::prefs::{NotificationPreferences, PreferenceStore};
use crate::remote::{HealthBackend, Resource};

/// Editable profile fields; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

pub struct ProfileViewModel {
    backend: Arc<dyn HealthBackend>,
    prefs: Arc<dyn PreferenceStore>,
    profile: Resource<UserProfile>,
}

impl ProfileViewModel {
    pub fn new(backend: Arc<dyn HealthBackend>, prefs: Arc<dyn PreferenceStore>) -> Self {
        Self {
            backend,
            prefs,
            profile: Resource::Loading,
        }
    }

    pub fn profile(&self) -> &Resource<UserProfile> {
        &self.profile
    }

    pub async fn load(&mut self) -> &Resource<UserProfile> {
        self.profile = Resource::Loading;
        self.profile = match self.prefs.user_id() {
            Some(user_id) => self.backend.get_profile(&user_id).await.into(),
            None => Resource::Error(RemoteError::AuthRequired.to_string()),
        };
        &self.profile
    }

    pub async fn update_profile(&mut self, update: ProfileUpdate) -> Result<UserProfile> {
        let mut profile = self.current()?;
        if let Some(name) = update.full_name {
            profile.full_name = Some(name).filter(|n| !n.trim().is_empty());
        }
        if let Some(phone) = update.phone {
            profile.phone = Some(phone).filter(|p| !p.trim().is_empty());
        }
        if update.date_of_birth.is_some() {
            profile.date_of_birth = update.date_of_birth;
        }

        let saved = self.backend.upsert_profile(&profile).await?;
        tracing::info!(user_id = %saved.id, "profile updated");
        self.profile = Resource::Success(saved.clone());
        Ok(saved)
    }

    /// Save notification settings. Turning notifications off cancels no
    /// alarms; it stops dispatch and boot recovery from acting.
    pub async fn update_notification_preferences(
        &mut self,
        prefs: NotificationPreferences,
    ) -> Result<UserProfile> {
        let mut profile = self.current()?;
        profile.set_notification_preferences(&prefs);

        let saved = self.backend.upsert_profile(&profile).await?;
        self.prefs
            .set_notification_preferences(&saved.notification_preferences())?;
        tracing::info!(
            user_id = %saved.id,
            enabled = prefs.enabled,
            reminder_minutes = prefs.reminder_minutes,
            "notification preferences updated"
        );
        self.profile = Resource::Success(saved.clone());
        Ok(saved)
    }

    fn current(&self) -> Result<UserProfile, RemoteError> {
        if let Some(profile) = self.profile.data() {
            return Ok(profile.clone());
        }
        let user_id = self.prefs.user_id().ok_or(RemoteError::AuthRequired)?;
        Err(RemoteError::NotFound {
            entity: "profile",
            id: user_id,
        })
    }
}
