use async_trait::async_trait;
use messenger_bridge::PlatformEvent;
use messenger_bridge::notification::{NotificationEvent, NotificationId, NotificationMessage};
use messenger_bridge::permission::Permission;
use notify_rust::Notification;
use tokio::sync::mpsc::Sender;

use crate::{NotificationPlatform, PlatformError};

/// Action identifier the notification server reports when the notification
/// body is activated.
#[cfg(all(unix, not(target_os = "macos")))]
const DEFAULT_ACTION: &str = "default";

/// Action identifier the notification server reports when the notification
/// is dismissed or expires.
#[cfg(all(unix, not(target_os = "macos")))]
const CLOSED_ACTION: &str = "__closed";

/// Notification platform backed by the desktop notification server.
///
/// Desktop environments do not prompt for permission, so a supported
/// environment always reports [`Permission::Granted`]. The notification server
/// is looked up once, when the platform is created.
#[derive(Clone)]
pub struct DesktopPlatform {
    /// Application name shown by the notification server.
    app_name: String,
    supported: bool,
    /// Where lifecycle events are reported. Events are dropped when unset.
    events: Option<Sender<PlatformEvent>>,
}

impl std::fmt::Display for DesktopPlatform {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "desktop notifications ({})", self.app_name)
    }
}

impl DesktopPlatform {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self::with_support(app_name, notification_server_available())
    }

    fn with_support(app_name: impl Into<String>, supported: bool) -> Self {
        Self {
            app_name: app_name.into(),
            supported,
            events: None,
        }
    }

    /// Reports lifecycle events of shown notifications to `events`.
    pub fn with_events(mut self, events: Sender<PlatformEvent>) -> Self {
        self.events = Some(events);
        self
    }

    fn build_notification(&self, message: &NotificationMessage) -> Notification {
        let mut notification = Notification::new();
        notification
            .appname(&self.app_name)
            .summary(&message.title)
            .body(&message.options.body);
        if !message.options.icon.is_empty() {
            notification.icon(&message.options.icon);
        }
        notification
    }

    fn report(&self, id: NotificationId, event: NotificationEvent) {
        if let Some(events) = &self.events {
            if let Err(error) = events.try_send(PlatformEvent::new(id, event)) {
                log::warn!("Dropped lifecycle event of notification {id}: {error}");
            }
        }
    }
}

/// Asks the session bus for a running notification server.
#[cfg(all(unix, not(target_os = "macos")))]
fn notification_server_available() -> bool {
    match notify_rust::get_server_information() {
        Ok(server) => {
            log::debug!("Notification server: {} {}", server.name, server.version);
            true
        }
        Err(error) => {
            log::debug!("No notification server reachable: {error}");
            false
        }
    }
}

/// macOS and Windows always provide a notification center.
#[cfg(not(all(unix, not(target_os = "macos"))))]
fn notification_server_available() -> bool {
    true
}

#[async_trait]
impl NotificationPlatform for DesktopPlatform {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn permission(&self) -> Permission {
        if self.supported {
            Permission::Granted
        } else {
            Permission::Denied
        }
    }

    async fn request_permission(&self) -> Permission {
        self.permission()
    }

    /// Only XDG servers report dismissal, and only with an event channel.
    fn reports_lifecycle(&self) -> bool {
        cfg!(all(unix, not(target_os = "macos"))) && self.events.is_some()
    }

    fn show(&self, id: NotificationId, message: &NotificationMessage) -> Result<(), PlatformError> {
        let mut notification = self.build_notification(message);

        #[cfg(all(unix, not(target_os = "macos")))]
        {
            notification.action(DEFAULT_ACTION, "Open");
            let handle = notification.show()?;
            self.report(id, NotificationEvent::Show);

            if let Some(events) = self.events.clone() {
                // waiting for an action blocks until the notification is gone
                std::thread::spawn(move || {
                    handle.wait_for_action(|action| {
                        let event = match action {
                            DEFAULT_ACTION => NotificationEvent::Click,
                            CLOSED_ACTION => NotificationEvent::Close,
                            other => NotificationEvent::from(other),
                        };
                        if events.blocking_send(PlatformEvent::new(id, event)).is_err() {
                            log::debug!("Event receiver for notification {id} is gone");
                        }
                    });
                });
            }
        }

        #[cfg(not(all(unix, not(target_os = "macos"))))]
        {
            notification.show().map(|_| ())?;
            self.report(id, NotificationEvent::Show);
        }

        Ok(())
    }
}
