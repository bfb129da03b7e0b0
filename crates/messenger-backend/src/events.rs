//! Lifecycle event handlers and their attachment to delivered notifications.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use messenger_bridge::notification::{NotificationEvent, NotificationId, NotificationMessage};

/// What a handler learns about the event it is invoked for.
#[derive(Debug, Clone, Copy)]
pub struct EventContext<'a> {
    pub id: NotificationId,
    pub event: &'a NotificationEvent,
    pub message: &'a NotificationMessage,
}

/// Callback invoked for a lifecycle event of a delivered notification.
pub type EventHandler = Arc<dyn Fn(&EventContext<'_>) + Send + Sync>;

/// Handlers keyed by event name.
///
/// Removing a handler keeps its entry with no handler, so enumeration through
/// [`EventRegistry::events`] still lists it.
#[derive(Clone, Default)]
pub struct EventRegistry {
    handlers: HashMap<NotificationEvent, Option<EventHandler>>,
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_map()
            .entries(
                self.handlers
                    .iter()
                    .map(|(event, handler)| (event.as_str(), handler.is_some())),
            )
            .finish()
    }
}

impl EventRegistry {
    /// Registers `handler` for `event`, replacing any previous handler.
    pub fn on(&mut self, event: impl Into<NotificationEvent>, handler: EventHandler) -> &mut Self {
        self.handlers.insert(event.into(), Some(handler));
        self
    }

    /// Clears the handler of `event`. The entry itself stays registered.
    pub fn off(&mut self, event: impl Into<NotificationEvent>) -> &mut Self {
        self.handlers.insert(event.into(), None);
        self
    }

    pub fn get(&self, event: &NotificationEvent) -> Option<&EventHandler> {
        self.handlers.get(event).and_then(Option::as_ref)
    }

    /// Every event that has an entry, with or without a handler.
    pub fn events(&self) -> impl Iterator<Item = (&NotificationEvent, bool)> {
        self.handlers
            .iter()
            .map(|(event, handler)| (event, handler.is_some()))
    }

    /// Snapshot of the handlers currently set, attached to a notification
    /// when it is sent.
    pub fn attached(&self) -> AttachedHandlers {
        AttachedHandlers {
            handlers: self
                .handlers
                .iter()
                .filter_map(|(event, handler)| {
                    handler
                        .as_ref()
                        .map(|handler| (event.clone(), handler.clone()))
                })
                .collect(),
        }
    }
}

/// Handlers attached to one delivered notification.
#[derive(Clone, Default)]
pub struct AttachedHandlers {
    handlers: HashMap<NotificationEvent, EventHandler>,
}

impl AttachedHandlers {
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Invokes the handler attached for `context.event`, if any. Returns
    /// whether a handler ran.
    pub fn invoke(&self, context: &EventContext<'_>) -> bool {
        match self.handlers.get(context.event) {
            Some(handler) => {
                handler(context);
                true
            }
            None => false,
        }
    }
}
