use std::collections::BTreeMap;

use messenger_bridge::config::MessengerConfig;
use messenger_bridge::notification::{NotificationId, NotificationMessage};

use crate::events::{AttachedHandlers, EventRegistry};

/// A notification handed to the platform, kept until it reaches a terminal
/// lifecycle event so its handlers can be invoked.
#[derive(Clone)]
pub struct DeliveredNotification {
    pub message: NotificationMessage,
    /// Handlers registered at the moment the notification was sent.
    pub handlers: AttachedHandlers,
}

/// The messenger state that holds configuration, event handlers, and the
/// notifications currently on screen.
///
/// It is designed to be wrapped in [`SharedState`] so the drain loop, the
/// platform event loop, and API callers can share it.
#[derive(Default)]
pub struct State {
    /// The active configuration.
    pub config: MessengerConfig,
    /// Handlers attached to notifications sent from now on.
    pub events: EventRegistry,
    /// Notifications that may still report lifecycle events, oldest first.
    pub delivered: BTreeMap<NotificationId, DeliveredNotification>,
    /// Last assigned notification id.
    pub last_id: u64,
}

impl State {
    pub fn new(config: MessengerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn next_id(&mut self) -> NotificationId {
        self.last_id += 1;
        NotificationId(self.last_id)
    }

    /// Keeps `delivered` until a terminal event for `id` arrives, forgetting
    /// the oldest notifications beyond `max_tracked_notifications`.
    pub fn track(&mut self, id: NotificationId, delivered: DeliveredNotification) {
        self.delivered.insert(id, delivered);
        while self.delivered.len() > self.config.max_tracked_notifications {
            if let Some((oldest, _)) = self.delivered.pop_first() {
                log::debug!("Forgetting handlers of notification {oldest}");
            }
        }
    }
}

/// Thread-safe, async-friendly shared reference to the messenger [`State`].
pub type SharedState = std::sync::Arc<tokio::sync::RwLock<State>>;

#[cfg(test)]
mod tests {
    use super::*;

    fn delivered(title: &str) -> DeliveredNotification {
        DeliveredNotification {
            message: NotificationMessage::new(title, Default::default()),
            handlers: AttachedHandlers::default(),
        }
    }

    #[test]
    fn oldest_notifications_are_forgotten_past_the_limit() {
        let mut config = MessengerConfig::default();
        config.set("maxTrackedNotifications", 2i64).unwrap();
        let mut state = State::new(config);

        for title in ["a", "b", "c"] {
            let id = state.next_id();
            state.track(id, delivered(title));
        }

        let kept: Vec<_> = state.delivered.keys().copied().collect();
        assert_eq!(kept, [NotificationId(2), NotificationId(3)]);
    }
}
