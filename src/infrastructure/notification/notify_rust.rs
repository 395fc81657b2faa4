//! Desktop notifications through notify-rust

use async_trait::async_trait;
use notify_rust::{Notification, Timeout};

use crate::application::ports::{NotificationError, NotificationIcon, Notifier};

const APP_NAME: &str = "dual-capture";

/// How long status notifications stay up
const STATUS_TIMEOUT_MS: u32 = 4000;

/// Notifier posting to the desktop notification service
pub struct NotifyRustNotifier {
    app_name: String,
}

impl NotifyRustNotifier {
    pub fn new() -> Self {
        Self::with_app_name(APP_NAME)
    }

    pub fn with_app_name(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }

    /// Warnings and errors stay until dismissed
    fn timeout_for(icon: NotificationIcon) -> Timeout {
        match icon {
            NotificationIcon::Warning | NotificationIcon::Error => Timeout::Never,
            _ => Timeout::Milliseconds(STATUS_TIMEOUT_MS),
        }
    }
}

impl Default for NotifyRustNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for NotifyRustNotifier {
    async fn notify(
        &self,
        title: &str,
        message: &str,
        icon: NotificationIcon,
    ) -> Result<(), NotificationError> {
        let mut notification = Notification::new();
        notification
            .appname(&self.app_name)
            .summary(title)
            .body(message)
            .icon(icon.icon_name())
            .timeout(Self::timeout_for(icon));

        // Showing blocks on the session bus
        tokio::task::spawn_blocking(move || {
            notification
                .show()
                .map(|_| ())
                .map_err(|e| NotificationError::SendFailed(e.to_string()))
        })
        .await
        .map_err(|e| NotificationError::SendFailed(format!("Task join error: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_app_name() {
        assert_eq!(NotifyRustNotifier::default().app_name, "dual-capture");
    }

    #[test]
    fn problems_do_not_expire() {
        assert_eq!(
            NotifyRustNotifier::timeout_for(NotificationIcon::Error),
            Timeout::Never
        );
        assert_eq!(
            NotifyRustNotifier::timeout_for(NotificationIcon::Saved),
            Timeout::Milliseconds(STATUS_TIMEOUT_MS)
        );
    }
}
