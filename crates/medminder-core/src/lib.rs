//! # Medminder Core Library
//!
//! This library provides the core logic for the Medminder medication and
//! appointment reminder app. All operations are available through the
//! standalone `medminder` CLI, which is a thin shell over this crate.
//!
//! ## Architecture
//!
//! - **Dose schedule**: frequency + first dose time to ordered daily times
//! - **Alarms**: daily dose alarms and one-shot appointment reminders behind
//!   the [`AlarmScheduler`] seam
//! - **Dispatch**: preference-gated rendering of fired alarms
//! - **Recovery**: re-deriving every alarm after a restart
//! - **Remote**: the [`HealthBackend`] trait and its Supabase client
//! - **State holders**: auth, medicines, appointments, profile
//! - **Storage**: TOML configuration and the SQLite alarm registry
//!
//! ## Key Components
//!
//! - [`AlarmManager`]: alarm lifecycle for medicines and appointments
//! - [`AuthViewModel`]: the four-state auth machine
//! - [`BootRecovery`]: restart-time alarm restoration
//! - [`SupabaseClient`]: production backend

pub mod alarm;
pub mod auth;
pub mod brightness;
pub mod clock;
pub mod error;
pub mod model;
pub mod notify;
pub mod prefs;
pub mod recovery;
pub mod remote;
pub mod schedule;
pub mod storage;
pub mod viewmodel;

pub use alarm::{AlarmKey, AlarmManager, AlarmPayload, AlarmScheduler, InMemoryAlarms, RegisteredAlarm, ScheduleOutcome};
pub use auth::{AuthState, AuthViewModel, Screen};
pub use brightness::{target_brightness, BrightnessSmoother};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{AlarmError, ConfigError, CoreError, DatabaseError, NotifyError, RemoteError, ValidationError};
pub use model::{Appointment, AppointmentDraft, AppointmentStatus, Medicine, MedicineDraft, Session, User, UserProfile};
pub use notify::{DispatchOutcome, NotificationDispatcher, NotificationRequest, Notifier};
pub use prefs::{MemoryPreferences, NotificationPreferences, PreferenceStore};
pub use recovery::{BootRecovery, RecoveryAction, RecoveryReport};
pub use remote::{HealthBackend, MemoryBackend, Resource, SupabaseClient};
pub use schedule::{calculate_schedule, parse_frequency_hours, DoseFrequency};
pub use storage::{AlarmDb, Config, ConfigStore};
pub use viewmodel::{AppointmentViewModel, MedicineViewModel, ProfileUpdate, ProfileViewModel};
