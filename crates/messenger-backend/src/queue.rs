//! Ordered queue of notifications waiting for their trigger.

use std::collections::VecDeque;
use std::fmt;

use messenger_bridge::notification::{NotificationMessage, NotificationOptions};

/// Predicate deciding whether a queued notification should be sent now.
pub type Trigger = Box<dyn FnMut() -> bool + Send>;

/// A notification waiting in the queue.
pub struct QueueItem {
    /// Sequence number, only used to tell items apart in logs.
    id: u64,
    message: NotificationMessage,
    trigger: Option<Trigger>,
}

impl fmt::Debug for QueueItem {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("QueueItem")
            .field("id", &self.id)
            .field("message", &self.message)
            .field("trigger", &self.trigger.is_some())
            .finish()
    }
}

impl QueueItem {
    pub fn message(&self) -> &NotificationMessage {
        &self.message
    }

    /// The item's own trigger wins over the default one; with neither, the
    /// item is due right away.
    fn is_due(&mut self, default_trigger: Option<&mut (dyn FnMut() -> bool + Send + '_)>) -> bool {
        match (&mut self.trigger, default_trigger) {
            (Some(trigger), _) => trigger(),
            (None, Some(default_trigger)) => default_trigger(),
            (None, None) => true,
        }
    }
}

/// Result of a single drain pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassOutcome {
    /// Items handed to the send capability and removed from the queue.
    pub sent: usize,
    /// Items left in the queue for the next pass.
    pub remaining: usize,
}

/// Notifications waiting to be sent, in insertion order.
///
/// Items are only ever removed, never reordered. Removal compacts the queue,
/// so [`NotificationQueue::len`] always counts pending work only.
#[derive(Debug, Default)]
pub struct NotificationQueue {
    items: VecDeque<QueueItem>,
    next_id: u64,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a notification. Without a trigger, the default trigger of the
    /// drain decides when it is sent.
    pub fn enqueue(
        &mut self,
        title: impl Into<String>,
        options: NotificationOptions,
        trigger: Option<Trigger>,
    ) -> &mut Self {
        self.next_id += 1;
        let item = QueueItem {
            id: self.next_id,
            message: NotificationMessage::new(title, options),
            trigger,
        };
        log::debug!("Queued notification {} ({:?})", item.id, item.message.title);
        self.items.push_back(item);
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Queued messages, first-in first.
    pub fn messages(&self) -> impl Iterator<Item = &NotificationMessage> {
        self.items.iter().map(QueueItem::message)
    }

    /// Drops every queued item without sending it.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Runs one drain pass: every item whose trigger allows it, in order, is
    /// handed to `send` and removed; the others stay in place.
    pub fn drain_pass(
        &mut self,
        mut default_trigger: Option<&mut (dyn FnMut() -> bool + Send + '_)>,
        mut send: impl FnMut(NotificationMessage),
    ) -> PassOutcome {
        let mut remaining = VecDeque::with_capacity(self.items.len());
        let mut sent = 0;

        while let Some(mut item) = self.items.pop_front() {
            if item.is_due(default_trigger.as_deref_mut()) {
                log::debug!("Sending queued notification {}", item.id);
                send(item.message);
                sent += 1;
            } else {
                remaining.push_back(item);
            }
        }

        self.items = remaining;
        PassOutcome {
            sent,
            remaining: self.items.len(),
        }
    }
}
