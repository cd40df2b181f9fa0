//! Authentication state machine.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Loading -> (Success(user) | Error(message))
//! Success <-> Loading <-> Error      (sign in / sign up / check again)
//! Success -> Error                    (sign out)
//! ```
//!
//! `Idle` is only the initial state. The current state selects the top-level
//! screen: splash while undecided, main app when signed in, auth flow
//! otherwise.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::RemoteError;
use crate::model::{User, UserProfile};
use crate::prefs::PreferenceStore;
use crate::remote::HealthBackend;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "lowercase")]
pub enum AuthState {
    Idle,
    Loading,
    Success(User),
    Error(String),
}

/// Top-level screen set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Screen {
    Splash,
    Main,
    Auth,
}

impl AuthState {
    pub fn screen(&self) -> Screen {
        match self {
            AuthState::Idle | AuthState::Loading => Screen::Splash,
            AuthState::Success(_) => Screen::Main,
            AuthState::Error(_) => Screen::Auth,
        }
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            AuthState::Success(user) => Some(user),
            _ => None,
        }
    }
}

pub const SIGNED_OUT: &str = "Signed out";
pub const NOT_SIGNED_IN: &str = "Not signed in";

/// Drives [`AuthState`] from backend auth calls.
///
/// On every successful sign-in the user id and the profile's notification
/// settings are written to the preference cache, which is what boot recovery
/// and the alarm handler read later.
pub struct AuthViewModel {
    backend: Arc<dyn HealthBackend>,
    prefs: Arc<dyn PreferenceStore>,
    state: AuthState,
}

impl AuthViewModel {
    pub fn new(backend: Arc<dyn HealthBackend>, prefs: Arc<dyn PreferenceStore>) -> Self {
        Self {
            backend,
            prefs,
            state: AuthState::Idle,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn screen(&self) -> Screen {
        self.state.screen()
    }

    /// Resolve the stored session, if any.
    pub async fn check_session(&mut self) -> &AuthState {
        self.state = AuthState::Loading;
        self.state = match self.backend.current_user().await {
            Ok(Some(user)) => self.signed_in(user, false).await,
            Ok(None) => AuthState::Error(NOT_SIGNED_IN.into()),
            Err(e) => AuthState::Error(e.to_string()),
        };
        &self.state
    }

    pub async fn sign_in(&mut self, email: &str, password: &str) -> &AuthState {
        if let Some(msg) = missing_credentials(email, password) {
            self.state = AuthState::Error(msg);
            return &self.state;
        }
        self.state = AuthState::Loading;
        self.state = match self.backend.sign_in(email.trim(), password).await {
            Ok(session) => self.signed_in(session.user, false).await,
            Err(e) => AuthState::Error(e.to_string()),
        };
        &self.state
    }

    pub async fn sign_up(&mut self, email: &str, password: &str) -> &AuthState {
        if let Some(msg) = missing_credentials(email, password) {
            self.state = AuthState::Error(msg);
            return &self.state;
        }
        self.state = AuthState::Loading;
        self.state = match self.backend.sign_up(email.trim(), password).await {
            Ok(session) => self.signed_in(session.user, true).await,
            Err(e) => AuthState::Error(e.to_string()),
        };
        &self.state
    }

    pub async fn sign_out(&mut self) -> &AuthState {
        if let Err(e) = self.backend.sign_out().await {
            tracing::warn!(error = %e, "remote sign-out failed, clearing local session anyway");
        }
        if let Err(e) = self.prefs.set_user_id(None) {
            tracing::warn!(error = %e, "failed to clear cached user id");
        }
        self.state = AuthState::Error(SIGNED_OUT.into());
        &self.state
    }

    async fn signed_in(&self, user: User, new_account: bool) -> AuthState {
        if let Err(e) = self.prefs.set_user_id(Some(&user.id)) {
            tracing::warn!(error = %e, "failed to cache user id");
        }

        let profile = if new_account {
            self.backend
                .upsert_profile(&UserProfile::for_user(&user))
                .await
        } else {
            match self.backend.get_profile(&user.id).await {
                Err(RemoteError::NotFound { .. }) => {
                    self.backend
                        .upsert_profile(&UserProfile::for_user(&user))
                        .await
                }
                other => other,
            }
        };

        match profile {
            Ok(profile) => {
                if let Err(e) = self
                    .prefs
                    .set_notification_preferences(&profile.notification_preferences())
                {
                    tracing::warn!(error = %e, "failed to cache notification preferences");
                }
            }
            Err(e) => tracing::warn!(error = %e, "profile unavailable, keeping cached preferences"),
        }

        AuthState::Success(user)
    }
}

fn missing_credentials(email: &str, password: &str) -> Option<String> {
    if email.trim().is_empty() || password.is_empty() {
        Some("Email and password are required".into())
    } else {
        None
    }
}
