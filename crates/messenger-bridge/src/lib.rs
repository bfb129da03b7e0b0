//! Shared types between the notification platform and the messenger service.
//!
//! This crate defines the plain data exchanged by the other crates of the
//! workspace: notification payloads, lifecycle events, permission state, and
//! the configuration model.
//!
//! The flow is deliberately one-directional:
//! - The messenger hands [`notification::NotificationMessage`]s to the
//!   platform for display.
//! - The platform pushes lifecycle events ([`PlatformEvent`]) back through a
//!   bounded [`tokio::sync::mpsc`] channel wrapped in [`EventChannels`].

pub mod config;
pub mod notification;
pub mod permission;

use tokio::sync::mpsc::{self, Receiver, Sender};

use crate::notification::{NotificationEvent, NotificationId};

/// A lifecycle event reported by the platform for a delivered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformEvent {
    /// Notification the event belongs to.
    pub id: NotificationId,
    /// What happened to it.
    pub event: NotificationEvent,
}

impl PlatformEvent {
    pub fn new(id: NotificationId, event: impl Into<NotificationEvent>) -> Self {
        Self {
            id,
            event: event.into(),
        }
    }
}

/// Paired `tokio::mpsc` endpoints carrying lifecycle events from the platform
/// to the messenger.
pub struct EventChannels {
    /// Sender handed to the platform adapter.
    pub platform_tx: Sender<PlatformEvent>,
    /// Receiver consumed by the messenger's event loop.
    pub messenger_rx: Receiver<PlatformEvent>,
}

impl EventChannels {
    /// Creates a new channel pair with the given buffer capacity.
    pub fn new(buffer: usize) -> Self {
        let (platform_tx, messenger_rx) = mpsc::channel(buffer);
        Self {
            platform_tx,
            messenger_rx,
        }
    }
}

impl Default for EventChannels {
    fn default() -> Self {
        Self::new(64)
    }
}
