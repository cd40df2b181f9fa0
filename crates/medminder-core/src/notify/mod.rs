//! Notification dispatch for fired alarms.
//!
//! The fire handler reads the cached preferences synchronously. When
//! notifications are disabled it returns before touching the notifier. Sound
//! and vibration are gated independently. Notifier failures are logged and
//! reported as [`DispatchOutcome::Failed`], never propagated.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::alarm::{AlarmKey, AlarmPayload};
use crate::error::NotifyError;
use crate::prefs::PreferenceStore;

/// A notification ready to be rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub id: AlarmKey,
    pub title: String,
    pub body: String,
    pub sound: bool,
    pub vibration: bool,
}

/// Platform notification surface.
pub trait Notifier: Send + Sync {
    fn notify(&self, request: &NotificationRequest) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// Notifications are disabled; nothing rendered.
    Suppressed,
    Shown,
    /// The notifier refused; the error was logged.
    Failed { reason: String },
}

/// Handles alarm-fired callbacks.
#[derive(Clone)]
pub struct NotificationDispatcher {
    prefs: Arc<dyn PreferenceStore>,
    notifier: Arc<dyn Notifier>,
}

impl NotificationDispatcher {
    pub fn new(prefs: Arc<dyn PreferenceStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { prefs, notifier }
    }

    pub fn on_alarm_fired(&self, key: &AlarmKey, payload: &AlarmPayload) -> DispatchOutcome {
        let prefs = self.prefs.notification_preferences();
        if !prefs.enabled {
            tracing::debug!(%key, "notifications disabled, suppressing");
            return DispatchOutcome::Suppressed;
        }

        let request = NotificationRequest {
            id: key.clone(),
            title: payload.title.clone(),
            body: payload.body.clone(),
            sound: prefs.sound,
            vibration: prefs.vibration,
        };

        match self.notifier.notify(&request) {
            Ok(()) => {
                tracing::info!(%key, "notification shown");
                DispatchOutcome::Shown
            }
            Err(NotifyError::PermissionDenied) => {
                tracing::warn!(%key, "notification permission not granted");
                DispatchOutcome::Failed {
                    reason: NotifyError::PermissionDenied.to_string(),
                }
            }
            Err(e) => {
                tracing::error!(%key, error = %e, "failed to show notification");
                DispatchOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
