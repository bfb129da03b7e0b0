//! Messenger setup and the timer-driven drain loop.
//!
//! The drain loop runs discrete passes over the send queue. A pass never
//! overlaps another one: the pause before the next pass is only scheduled
//! after the current pass has finished.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use messenger_bridge::PlatformEvent;
use messenger_bridge::config::MessengerConfig;
use messenger_bridge::permission::Permission;
use messenger_platform::NotificationPlatform;
use tokio::sync::mpsc::Receiver;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::app::Messenger;
use crate::error::MessengerError;
use crate::queue::Trigger;

/// Why a drain loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainStop {
    /// A pass left the queue empty.
    Emptied,
    /// The loop was cancelled; unsent items stay queued.
    Cancelled,
    /// `maxDrainPasses` passes ran; unsent items stay queued.
    PassLimit,
}

/// What a finished drain loop did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainSummary {
    /// Number of completed passes.
    pub passes: u32,
    /// Items removed from the queue because their trigger allowed it.
    pub sent: usize,
    /// Items left in the queue after the last pass.
    pub remaining: usize,
    pub stop: DrainStop,
}

/// Handle to a running drain loop.
pub struct DrainHandle {
    cancel: CancellationToken,
    task: JoinHandle<DrainSummary>,
}

impl DrainHandle {
    /// Stops the loop before its next pass.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the loop to stop.
    pub async fn join(self) -> Result<DrainSummary, MessengerError> {
        Ok(self.task.await?)
    }
}

/// Clears the draining flag when the loop task ends, even by panic.
struct DrainingGuard(Arc<AtomicBool>);

impl Drop for DrainingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Messenger {
    /// Starts draining the send queue.
    ///
    /// Each pass sends, in order, every item whose own trigger (or else
    /// `default_trigger`, or else nothing) allows it. While items remain, the
    /// next pass runs `queueTimeout` milliseconds later. Only one drain loop
    /// may run at a time.
    pub fn drain(
        self: &Arc<Self>,
        default_trigger: Option<Trigger>,
    ) -> Result<DrainHandle, MessengerError> {
        if self.draining.swap(true, Ordering::AcqRel) {
            return Err(MessengerError::DrainInProgress);
        }

        let guard = DrainingGuard(self.draining.clone());
        let cancel = self.shutdown.child_token();
        let messenger = self.clone();
        let loop_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            let _guard = guard;
            messenger.run_drain_loop(default_trigger, loop_cancel).await
        });

        Ok(DrainHandle { cancel, task })
    }

    async fn run_drain_loop(
        &self,
        mut default_trigger: Option<Trigger>,
        cancel: CancellationToken,
    ) -> DrainSummary {
        let mut summary = DrainSummary {
            passes: 0,
            sent: 0,
            remaining: 0,
            stop: DrainStop::Emptied,
        };

        loop {
            if self.permission.state() == Permission::Pending {
                log::debug!("Holding queued notifications until permission resolves");
                tokio::select! {
                    _ = cancel.cancelled() => {
                        summary.stop = DrainStop::Cancelled;
                        break;
                    }
                    permission = self.permission.resolved() => {
                        log::debug!("Resuming drain, permission is {permission}");
                    }
                }
            }

            if cancel.is_cancelled() {
                summary.stop = DrainStop::Cancelled;
                break;
            }

            let mut due = Vec::new();
            let outcome = self
                .queue
                .lock()
                .await
                .drain_pass(default_trigger.as_deref_mut(), |message| due.push(message));
            for message in due {
                self.deliver(message).await;
            }

            summary.passes += 1;
            summary.sent += outcome.sent;
            summary.remaining = outcome.remaining;
            log::debug!(
                "Drain pass {} sent {} notification(-s), {} remaining",
                summary.passes,
                outcome.sent,
                outcome.remaining
            );

            if outcome.remaining == 0 {
                summary.stop = DrainStop::Emptied;
                break;
            }

            let (queue_timeout, max_passes) = {
                let state = self.state.read().await;
                (state.config.queue_timeout(), state.config.max_drain_passes)
            };
            if max_passes.is_some_and(|max| summary.passes >= max) {
                summary.stop = DrainStop::PassLimit;
                break;
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    summary.stop = DrainStop::Cancelled;
                    break;
                }
                _ = tokio::time::sleep(queue_timeout) => {}
            }
        }

        log::info!(
            "Drain loop stopped ({:?}) after {} pass(-es): {} sent, {} remaining",
            summary.stop,
            summary.passes,
            summary.sent,
            summary.remaining
        );
        summary
    }
}

/// Creates a messenger, starts consuming platform lifecycle events from
/// `events`, and requests notification permission.
///
/// The permission request runs in the background; drains started before it
/// resolves hold their items until it does. Stop everything with
/// [`Messenger::shutdown`].
pub fn start(
    platform: Arc<dyn NotificationPlatform>,
    config: MessengerConfig,
    events: Receiver<PlatformEvent>,
) -> Result<Arc<Messenger>, MessengerError> {
    let messenger = Messenger::new(platform, config)?;

    let consumer = messenger.clone();
    let cancel = messenger.shutdown.child_token();
    tokio::spawn(async move { consumer.consume_platform_events(events, cancel).await });

    let _permission = messenger.init();
    Ok(messenger)
}
