//! # Notification Delivery
//!
//! The core decides who hears about what and renders the [`Message`]s;
//! a [`Notifier`] only delivers them. The default [`LogNotifier`] writes
//! each message to the log instead of sending mail.

use lostfound_core::{Message, NotificationRun};
use tracing::{info, warn};

/// Delivers rendered messages.
pub trait Notifier {
    fn deliver(&self, message: &Message) -> Result<(), String>;
}

/// Writes messages to the `tracing` log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn deliver(&self, message: &Message) -> Result<(), String> {
        info!(
            to = %message.to,
            email = %message.email,
            subject = %message.subject,
            "notification"
        );
        Ok(())
    }
}

/// Delivery counts of one notification run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Delivered {
    pub matches: usize,
    pub reminders: usize,
    pub failed: usize,
}

/// Hand every message of `run` to `notifier`. A failed delivery is logged
/// and counted; the rest still go out.
pub fn deliver_run(notifier: &dyn Notifier, run: &NotificationRun) -> Delivered {
    let mut delivered = Delivered::default();
    for message in &run.match_messages {
        match notifier.deliver(message) {
            Ok(()) => delivered.matches += 1,
            Err(e) => {
                warn!(to = %message.to, error = %e, "match notification failed");
                delivered.failed += 1;
            }
        }
    }
    for message in &run.reminders {
        match notifier.deliver(message) {
            Ok(()) => delivered.reminders += 1,
            Err(e) => {
                warn!(to = %message.to, error = %e, "reminder failed");
                delivered.failed += 1;
            }
        }
    }
    delivered
}
