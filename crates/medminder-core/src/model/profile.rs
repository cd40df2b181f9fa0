use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::prefs::NotificationPreferences;

/// An authenticated account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: String,
}

/// Tokens returned by a successful sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: User,
}

/// Server-side profile row. Holds the authoritative notification settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
    #[serde(default = "default_reminder_minutes")]
    pub reminder_minutes: u32,
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
    #[serde(default = "default_true")]
    pub vibration_enabled: bool,
}

fn default_true() -> bool {
    true
}

fn default_reminder_minutes() -> u32 {
    NotificationPreferences::default().reminder_minutes
}

impl UserProfile {
    /// Empty profile for a freshly registered user.
    pub fn for_user(user: &User) -> Self {
        let prefs = NotificationPreferences::default();
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            full_name: None,
            phone: None,
            date_of_birth: None,
            notifications_enabled: prefs.enabled,
            reminder_minutes: prefs.reminder_minutes,
            sound_enabled: prefs.sound,
            vibration_enabled: prefs.vibration,
        }
    }

    pub fn notification_preferences(&self) -> NotificationPreferences {
        NotificationPreferences {
            enabled: self.notifications_enabled,
            reminder_minutes: self.reminder_minutes,
            sound: self.sound_enabled,
            vibration: self.vibration_enabled,
        }
    }

    pub fn set_notification_preferences(&mut self, prefs: &NotificationPreferences) {
        self.notifications_enabled = prefs.enabled;
        self.reminder_minutes = prefs.reminder_minutes;
        self.sound_enabled = prefs.sound;
        self.vibration_enabled = prefs.vibration;
    }
}
