//! Terminal notification surface.

use medminder_core::error::NotifyError;
use medminder_core::{NotificationRequest, Notifier};

/// Prints notifications to stdout. A bell character stands in for sound.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, request: &NotificationRequest) -> Result<(), NotifyError> {
        let bell = if request.sound { "\x07" } else { "" };
        let buzz = if request.vibration { " [vibrate]" } else { "" };
        println!("{bell}[{}] {}{buzz}", request.title, request.body);
        Ok(())
    }
}
