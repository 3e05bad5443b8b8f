//! Notifier port - user-visible toasts

use crate::domain::Notification;

/// Sink for user-visible notifications
///
/// Store actions emit exactly one notification per failed action and one
/// per successful mutating action. Implementations must not block.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);

    fn success(&self, message: &str) {
        self.notify(Notification::success(message));
    }

    fn error(&self, message: &str) {
        self.notify(Notification::error(message));
    }
}
