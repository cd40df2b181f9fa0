pub mod alarms;
pub mod appt;
pub mod auth;
pub mod boot;
pub mod brightness;
pub mod config;
pub mod med;
pub mod profile;
