//! Desktop notifications via notify-rust (D-Bus on Linux).

use std::sync::Mutex;

use async_trait::async_trait;
use notify_rust::{Notification, Timeout};
use tracing::debug;

use upis_core::{
    domain::{NotificationChannel, NotificationId},
    errors::Error,
    ports::Notifier,
    Result,
};

const ANNOUNCEMENT_TIMEOUT_MS: u32 = 5000;
const ICON: &str = "dialog-information";

// Only the freedesktop backend can replace by id and close a shown notification.
#[cfg(all(unix, not(target_os = "macos")))]
type StatusHandle = notify_rust::NotificationHandle;
#[cfg(not(all(unix, not(target_os = "macos"))))]
type StatusHandle = ();

#[cfg(all(unix, not(target_os = "macos")))]
fn close_status(handle: StatusHandle) {
    handle.close();
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
fn close_status(_handle: StatusHandle) {}

pub struct DesktopNotifier {
    enabled: bool,
    channel: Mutex<Option<NotificationChannel>>,
    status: Mutex<Option<StatusHandle>>,
}

impl DesktopNotifier {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            channel: Mutex::new(None),
            status: Mutex::new(None),
        }
    }

    fn app_name(&self) -> String {
        self.channel
            .lock()
            .ok()
            .and_then(|c| c.as_ref().map(|c| c.name.clone()))
            .unwrap_or_else(|| "UPI Speaker".to_string())
    }

    fn take_status(&self) -> Option<StatusHandle> {
        self.status.lock().ok().and_then(|mut s| s.take())
    }

    async fn display(
        &self,
        id: NotificationId,
        title: &str,
        body: &str,
        timeout: Timeout,
    ) -> Result<Option<StatusHandle>> {
        if !self.enabled {
            return Ok(None);
        }

        debug!("Notification {}: {title}", id.0);
        let app_name = self.app_name();
        let title = title.to_string();
        let body = body.to_string();

        tokio::task::spawn_blocking(move || {
            let mut n = Notification::new();
            n.appname(&app_name)
                .summary(&title)
                .body(&body)
                .icon(ICON)
                .timeout(timeout);
            #[cfg(all(unix, not(target_os = "macos")))]
            n.id(id.0);
            let shown = n
                .show()
                .map_err(|e| Error::Notification(format!("failed to show notification: {e}")))?;
            #[cfg(all(unix, not(target_os = "macos")))]
            let handle: StatusHandle = shown;
            #[cfg(not(all(unix, not(target_os = "macos"))))]
            let handle: StatusHandle = {
                let _ = shown;
            };
            Ok(Some(handle))
        })
        .await
        .map_err(|e| Error::Notification(format!("notification task failed: {e}")))?
    }
}

#[async_trait]
impl Notifier for DesktopNotifier {
    async fn create_channel(&self, channel: &NotificationChannel) -> Result<()> {
        debug!("Notification channel {} ({})", channel.id, channel.name);
        if let Ok(mut c) = self.channel.lock() {
            *c = Some(channel.clone());
        }
        Ok(())
    }

    async fn show(&self, id: NotificationId, title: &str, body: &str) -> Result<()> {
        let timeout = if id == NotificationId::STATUS {
            Timeout::Never
        } else {
            Timeout::Milliseconds(ANNOUNCEMENT_TIMEOUT_MS)
        };
        let handle = self.display(id, title, body, timeout).await?;
        if id == NotificationId::STATUS {
            if let (Some(handle), Ok(mut status)) = (handle, self.status.lock()) {
                *status = Some(handle);
            }
        }
        Ok(())
    }

    /// Closes the status notification if one is showing. Announcements expire
    /// on their own.
    async fn cancel(&self, id: NotificationId) -> Result<()> {
        if id != NotificationId::STATUS {
            return Ok(());
        }
        let Some(handle) = self.take_status() else {
            debug!("No status notification to close");
            return Ok(());
        };
        tokio::task::spawn_blocking(move || close_status(handle))
            .await
            .map_err(|e| Error::Notification(format!("notification close task failed: {e}")))
    }
}
