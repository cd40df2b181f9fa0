//! State holders.
//!
//! Each holder owns a [`Resource`](crate::remote::Resource) for the data it
//! renders and takes `&mut self` for mutations, so one holder never runs two
//! writes at once. Alarm side effects run after a successful remote write.

mod appointments;
mod medicines;
mod profile;

pub use appointments::AppointmentViewModel;
pub use medicines::MedicineViewModel;
pub use profile::{ProfileUpdate, ProfileViewModel};
