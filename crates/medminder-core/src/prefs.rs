//! Local preference cache.
//!
//! The alarm-fired handler and boot recovery must read the signed-in user and
//! notification settings synchronously, without a network round-trip. The
//! authoritative copy lives on the server-side profile; this cache mirrors it.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::error::Result;

/// Notification settings mirrored from the user profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Lead time for appointment reminders.
    #[serde(default = "default_reminder_minutes")]
    pub reminder_minutes: u32,
    #[serde(default = "default_true")]
    pub sound: bool,
    #[serde(default = "default_true")]
    pub vibration: bool,
}

fn default_true() -> bool {
    true
}

fn default_reminder_minutes() -> u32 {
    15
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            enabled: true,
            reminder_minutes: default_reminder_minutes(),
            sound: true,
            vibration: true,
        }
    }
}

/// Synchronous key-value cache of session and notification state.
///
/// Passed explicitly to every component that needs it.
pub trait PreferenceStore: Send + Sync {
    fn user_id(&self) -> Option<String>;

    fn set_user_id(&self, user_id: Option<&str>) -> Result<()>;

    fn notification_preferences(&self) -> NotificationPreferences;

    fn set_notification_preferences(&self, prefs: &NotificationPreferences) -> Result<()>;

    fn notifications_enabled(&self) -> bool {
        self.notification_preferences().enabled
    }

    fn reminder_minutes(&self) -> u32 {
        self.notification_preferences().reminder_minutes
    }
}

/// In-process cache, used by tests and embedders without a config file.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    inner: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    user_id: Option<String>,
    prefs: NotificationPreferences,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache pre-populated with a signed-in user.
    pub fn signed_in(user_id: &str, prefs: NotificationPreferences) -> Self {
        Self {
            inner: Mutex::new(MemoryState {
                user_id: Some(user_id.to_string()),
                prefs,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // A poisoned cache still holds plain data; keep serving it.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PreferenceStore for MemoryPreferences {
    fn user_id(&self) -> Option<String> {
        self.lock().user_id.clone()
    }

    fn set_user_id(&self, user_id: Option<&str>) -> Result<()> {
        self.lock().user_id = user_id.map(str::to_string);
        Ok(())
    }

    fn notification_preferences(&self) -> NotificationPreferences {
        self.lock().prefs
    }

    fn set_notification_preferences(&self, prefs: &NotificationPreferences) -> Result<()> {
        self.lock().prefs = *prefs;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_everything_with_fifteen_minute_lead() {
        let prefs = NotificationPreferences::default();
        assert!(prefs.enabled && prefs.sound && prefs.vibration);
        assert_eq!(prefs.reminder_minutes, 15);
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryPreferences::new();
        assert!(store.user_id().is_none());

        store.set_user_id(Some("u1")).unwrap();
        assert_eq!(store.user_id().as_deref(), Some("u1"));

        let prefs = NotificationPreferences {
            enabled: false,
            ..Default::default()
        };
        store.set_notification_preferences(&prefs).unwrap();
        assert!(!store.notifications_enabled());

        store.set_user_id(None).unwrap();
        assert!(store.user_id().is_none());
    }
}
