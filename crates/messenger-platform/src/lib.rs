//! Native notification capability behind a small trait.
//!
//! The messenger treats the operating system's notification service as an
//! opaque capability. This crate describes that capability with
//! [`NotificationPlatform`] and ships one implementation:
//! - [`desktop::DesktopPlatform`] talks to the desktop notification server
//!   through `notify-rust` and reports click/close events where the server
//!   supports actions.
//!
//! # Threading
//! [`NotificationPlatform::show`] is called from async code. Implementations
//! must return promptly and move any waiting (e.g. for user actions) onto
//! their own threads.

pub mod desktop;

use async_trait::async_trait;
use messenger_bridge::notification::{NotificationId, NotificationMessage};
use messenger_bridge::permission::Permission;

/// Errors reported by a platform when a notification cannot be displayed.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// No notification service is available in this environment.
    #[error("notifications are not supported in this environment")]
    Unsupported,
    /// The desktop notification server rejected or failed to display the
    /// notification. You should refer to notify-rust's error for details.
    #[error("failed to show desktop notification: {0}")]
    Desktop(#[from] notify_rust::error::Error),
}

/// A native notification capability.
#[async_trait]
pub trait NotificationPlatform: Send + Sync {
    /// Returns `true` when the environment can display notifications at all.
    fn is_supported(&self) -> bool;

    /// Permission already known to the platform, without prompting the user.
    /// Returns [`Permission::Unset`] when the user has not decided yet.
    fn permission(&self) -> Permission;

    /// Asks the user for permission and resolves with the answer.
    async fn request_permission(&self) -> Permission;

    /// Whether shown notifications eventually report a terminal `close` or
    /// `error` event. Handlers of notifications on a platform that does not
    /// are never kept after sending.
    fn reports_lifecycle(&self) -> bool {
        true
    }

    /// Displays a notification. Lifecycle events for it are reported under
    /// `id`, if the platform reports them at all.
    fn show(&self, id: NotificationId, message: &NotificationMessage) -> Result<(), PlatformError>;
}
