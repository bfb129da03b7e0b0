//! The messenger service and its public API.
//!
//! [`Messenger`] owns the shared state, the send queue, and the permission
//! gate, and routes lifecycle events from the platform to the handlers that
//! were attached when each notification was sent.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use messenger_bridge::PlatformEvent;
use messenger_bridge::config::{ConfigValue, MessengerConfig};
use messenger_bridge::notification::{
    NotificationEvent, NotificationId, NotificationMessage, NotificationOptions,
};
use messenger_bridge::permission::Permission;
use messenger_platform::NotificationPlatform;
use tokio::sync::{Mutex, RwLock, mpsc::Receiver};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::MessengerError;
use crate::events::{EventContext, EventHandler};
use crate::permission::PermissionGate;
use crate::queue::{NotificationQueue, Trigger};
use crate::state::{DeliveredNotification, SharedState, State};

/// What happened to a notification passed to [`Messenger::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The platform accepted the notification.
    Delivered(NotificationId),
    /// Delivery is not permitted; nothing was shown.
    Skipped(Permission),
    /// The platform failed to show the notification. Its `error` handler, if
    /// any, has been invoked.
    Failed(NotificationId),
}

/// Notification service shared by API callers, the drain loop, and the
/// platform event loop.
pub struct Messenger {
    pub(crate) state: SharedState,
    pub(crate) queue: Mutex<NotificationQueue>,
    pub(crate) permission: PermissionGate,
    pub(crate) platform: Arc<dyn NotificationPlatform>,
    /// Set while a drain loop runs.
    pub(crate) draining: Arc<AtomicBool>,
    /// Parent of every loop spawned by this messenger.
    pub(crate) shutdown: CancellationToken,
}

impl Messenger {
    /// Creates a messenger on top of `platform`.
    ///
    /// Fails with [`MessengerError::UnsupportedEnvironment`] when the platform
    /// cannot display notifications at all.
    pub fn new(
        platform: Arc<dyn NotificationPlatform>,
        config: MessengerConfig,
    ) -> Result<Arc<Self>, MessengerError> {
        if !platform.is_supported() {
            return Err(MessengerError::UnsupportedEnvironment);
        }

        Ok(Arc::new(Self {
            state: Arc::new(RwLock::new(State::new(config))),
            queue: Mutex::new(NotificationQueue::new()),
            permission: PermissionGate::new(),
            platform,
            draining: Arc::new(AtomicBool::new(false)),
            shutdown: CancellationToken::new(),
        }))
    }

    pub fn is_supported(&self) -> bool {
        self.platform.is_supported()
    }

    /// Current permission state.
    pub fn permission(&self) -> Permission {
        self.permission.state()
    }

    /// Requests permission to deliver notifications.
    ///
    /// The gate is marked pending before this returns, so a drain started
    /// right after holds its items until the answer arrives. The returned
    /// task resolves with that answer. Must be called within a tokio runtime.
    pub fn init(self: &Arc<Self>) -> JoinHandle<Permission> {
        let gate = self.permission.clone();

        let current = gate.state();
        if current.is_resolved() {
            return tokio::spawn(async move { current });
        }

        let known = self.platform.permission();
        if known.is_resolved() {
            gate.resolve(known);
            log::info!("Notification permission is already {known}");
            return tokio::spawn(async move { known });
        }

        if !gate.begin() {
            return tokio::spawn(async move { gate.resolved().await });
        }

        let platform = self.platform.clone();
        tokio::spawn(async move {
            let answer = match platform.request_permission().await {
                answer if answer.is_resolved() => answer,
                _ => Permission::Denied,
            };
            gate.resolve(answer);
            log::info!("Notification permission resolved as {answer}");
            answer
        })
    }

    /// Fails with [`MessengerError::PermissionDenied`] unless delivery is
    /// permitted. [`Messenger::send`] never fails; use this for a strict check.
    pub fn require_permission(&self) -> Result<(), MessengerError> {
        match self.permission.state() {
            Permission::Granted => Ok(()),
            other => Err(MessengerError::PermissionDenied(other)),
        }
    }

    /// Reads a configuration value.
    pub async fn config(&self, key: &str) -> Option<ConfigValue> {
        self.state.read().await.config.get(key)
    }

    /// Snapshot of the whole configuration.
    pub async fn configuration(&self) -> MessengerConfig {
        self.state.read().await.config.clone()
    }

    /// Stores a configuration value. `queueTimeout` takes effect on the next
    /// pause between drain passes.
    pub async fn set_config(
        &self,
        key: impl Into<String>,
        value: impl Into<ConfigValue>,
    ) -> Result<&Self, MessengerError> {
        self.state.write().await.config.set(key, value)?;
        Ok(self)
    }

    /// Stores several configuration values; none is applied if one is invalid.
    pub async fn add_config<K, V>(
        &self,
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Result<&Self, MessengerError>
    where
        K: Into<String>,
        V: Into<ConfigValue>,
    {
        self.state.write().await.config.extend(entries)?;
        Ok(self)
    }

    /// Attaches `handler` to `event` for notifications sent from now on.
    pub async fn on<F>(&self, event: impl Into<NotificationEvent>, handler: F) -> &Self
    where
        F: Fn(&EventContext<'_>) + Send + Sync + 'static,
    {
        let handler: EventHandler = Arc::new(handler);
        self.state.write().await.events.on(event, handler);
        self
    }

    /// Detaches the handler of `event` for notifications sent from now on.
    pub async fn off(&self, event: impl Into<NotificationEvent>) -> &Self {
        self.state.write().await.events.off(event);
        self
    }

    /// Sends a notification right away.
    ///
    /// Without granted permission this is a silent no-op reported as
    /// [`SendOutcome::Skipped`]. Platform failures are logged and dispatched
    /// as an `error` event; they are never returned as errors.
    pub async fn send(&self, title: impl Into<String>, options: NotificationOptions) -> SendOutcome {
        self.deliver(NotificationMessage::new(title, options)).await
    }

    pub(crate) async fn deliver(&self, message: NotificationMessage) -> SendOutcome {
        let permission = self.permission.state();
        if !permission.is_granted() {
            log::debug!(
                "Not sending {:?}: notification permission is {permission}",
                message.title
            );
            return SendOutcome::Skipped(permission);
        }

        let (id, delivered) = {
            let mut state = self.state.write().await;
            let id = state.next_id();
            let delivered = DeliveredNotification {
                message,
                handlers: state.events.attached(),
            };
            if !delivered.handlers.is_empty() && self.platform.reports_lifecycle() {
                state.track(id, delivered.clone());
            }
            (id, delivered)
        };

        match self.platform.show(id, &delivered.message) {
            Ok(()) => {
                log::debug!("Delivered notification {id} ({:?})", delivered.message.title);
                SendOutcome::Delivered(id)
            }
            Err(error) => {
                log::warn!("Failed to deliver notification {id}: {error}");
                self.state.write().await.delivered.remove(&id);
                notify(id, &NotificationEvent::Error, &delivered);
                SendOutcome::Failed(id)
            }
        }
    }

    /// Appends a notification to the send queue. Its sending is decided by
    /// the default trigger of the next drain.
    pub async fn queue(&self, title: impl Into<String>, options: NotificationOptions) -> &Self {
        self.queue.lock().await.enqueue(title, options, None);
        self
    }

    /// Appends a notification that is sent once `trigger` returns `true`.
    pub async fn queue_with_trigger<F>(
        &self,
        title: impl Into<String>,
        options: NotificationOptions,
        trigger: F,
    ) -> &Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let trigger: Trigger = Box::new(trigger);
        self.queue.lock().await.enqueue(title, options, Some(trigger));
        self
    }

    /// Number of notifications waiting in the send queue.
    pub async fn pending(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Messages waiting in the send queue, first-in first.
    pub async fn queued_messages(&self) -> Vec<NotificationMessage> {
        self.queue.lock().await.messages().cloned().collect()
    }

    /// Invokes the handler attached to the event's notification when it was
    /// sent. Terminal events release the notification afterwards.
    pub async fn dispatch_event(&self, event: PlatformEvent) {
        let delivered = {
            let mut state = self.state.write().await;
            if event.event.is_terminal() {
                state.delivered.remove(&event.id)
            } else {
                state.delivered.get(&event.id).cloned()
            }
        };

        let Some(delivered) = delivered else {
            log::debug!("Ignoring {} for unknown notification {}", event.event, event.id);
            return;
        };

        notify(event.id, &event.event, &delivered);
    }

    /// Number of sent notifications whose handlers are kept for later
    /// lifecycle events.
    pub async fn tracked(&self) -> usize {
        self.state.read().await.delivered.len()
    }

    /// Reads lifecycle events from the platform and dispatches them until the
    /// channel closes or `cancel` fires.
    pub async fn consume_platform_events(
        self: &Arc<Self>,
        mut rx: Receiver<PlatformEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = rx.recv() => match event {
                    Some(event) => {
                        log::debug!("Got a platform event: {event:?}");
                        self.dispatch_event(event).await;
                    }
                    None => break,
                },
            }
        }
        log::debug!("Platform event loop stopped");
    }

    /// Stops every loop spawned by this messenger, including a running drain.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

fn notify(id: NotificationId, event: &NotificationEvent, delivered: &DeliveredNotification) {
    let context = EventContext {
        id,
        event,
        message: &delivered.message,
    };
    if !delivered.handlers.invoke(&context) {
        log::trace!("No {event} handler attached to notification {id}");
    }
}
