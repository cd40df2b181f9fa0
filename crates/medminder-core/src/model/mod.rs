//! Domain records as stored by the remote backend.

pub mod appointment;
mod medicine;
mod profile;

pub use appointment::{Appointment, AppointmentDraft, AppointmentStatus};
pub use medicine::{Medicine, MedicineDraft};
pub use profile::{Session, User, UserProfile};
