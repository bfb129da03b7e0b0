use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use messenger_backend::{
    DrainStop, DrainSummary, EventContext, Messenger, MessengerError, SendOutcome, Trigger,
};
use messenger_bridge::config::{ConfigValue, MessengerConfig};
use messenger_bridge::notification::{
    NotificationEvent, NotificationId, NotificationMessage, NotificationOptions,
};
use messenger_bridge::permission::Permission;
use messenger_bridge::{EventChannels, PlatformEvent};
use messenger_platform::{NotificationPlatform, PlatformError};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Platform double that records every notification it is asked to show.
struct RecordingPlatform {
    supported: bool,
    known: Permission,
    answer: Permission,
    /// When set, the permission request waits for a notification first.
    release: Option<Arc<Notify>>,
    fail: bool,
    /// Whether shown notifications report `close`/`error` later on.
    reports: bool,
    shown: Mutex<Vec<(NotificationId, NotificationMessage)>>,
}

impl RecordingPlatform {
    fn granted() -> Self {
        Self {
            supported: true,
            known: Permission::Granted,
            answer: Permission::Granted,
            release: None,
            fail: false,
            reports: true,
            shown: Mutex::new(Vec::new()),
        }
    }

    fn asking(answer: Permission) -> Self {
        Self {
            known: Permission::Unset,
            answer,
            ..Self::granted()
        }
    }

    fn titles(&self) -> Vec<String> {
        self.shown
            .lock()
            .unwrap()
            .iter()
            .map(|(_, message)| message.title.clone())
            .collect()
    }
}

#[async_trait]
impl NotificationPlatform for RecordingPlatform {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn permission(&self) -> Permission {
        self.known
    }

    async fn request_permission(&self) -> Permission {
        if let Some(release) = &self.release {
            release.notified().await;
        }
        self.answer
    }

    fn show(&self, id: NotificationId, message: &NotificationMessage) -> Result<(), PlatformError> {
        if self.fail {
            return Err(PlatformError::Unsupported);
        }
        self.shown.lock().unwrap().push((id, message.clone()));
        Ok(())
    }

    fn reports_lifecycle(&self) -> bool {
        self.reports
    }
}

fn config(queue_timeout: i64, max_drain_passes: Option<i64>) -> MessengerConfig {
    let mut config = MessengerConfig::default();
    config.set("queueTimeout", queue_timeout).unwrap();
    if let Some(passes) = max_drain_passes {
        config.set("maxDrainPasses", passes).unwrap();
    }
    config
}

async fn granted_messenger(
    platform: &Arc<RecordingPlatform>,
    config: MessengerConfig,
) -> Arc<Messenger> {
    let messenger = Messenger::new(platform.clone(), config).unwrap();
    assert_eq!(messenger.init().await.unwrap(), Permission::Granted);
    messenger
}

fn counter_handler(counter: &Arc<AtomicUsize>) -> impl Fn(&EventContext<'_>) + Send + Sync + 'static {
    let counter = counter.clone();
    move |_: &EventContext<'_>| {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

fn always(value: bool) -> Option<Trigger> {
    Some(Box::new(move || value))
}

#[test]
fn unsupported_environment_is_reported_at_creation() {
    let platform = RecordingPlatform {
        supported: false,
        ..RecordingPlatform::granted()
    };

    let result = Messenger::new(Arc::new(platform), MessengerConfig::default());
    assert!(matches!(result, Err(MessengerError::UnsupportedEnvironment)));
}

#[tokio::test]
async fn send_without_permission_is_a_silent_no_op() {
    let platform = Arc::new(RecordingPlatform::asking(Permission::Denied));
    let messenger = Messenger::new(platform.clone(), MessengerConfig::default()).unwrap();

    let outcome = messenger.send("never requested", NotificationOptions::new()).await;
    assert_eq!(outcome, SendOutcome::Skipped(Permission::Unset));

    assert_eq!(messenger.init().await.unwrap(), Permission::Denied);
    let outcome = messenger.send("denied", NotificationOptions::new()).await;
    assert_eq!(outcome, SendOutcome::Skipped(Permission::Denied));

    assert!(platform.titles().is_empty());
    assert!(matches!(
        messenger.require_permission(),
        Err(MessengerError::PermissionDenied(Permission::Denied))
    ));
}

#[tokio::test]
async fn permission_is_resolved_once() {
    let platform = Arc::new(RecordingPlatform::asking(Permission::Granted));
    let messenger = Messenger::new(platform.clone(), MessengerConfig::default()).unwrap();

    let first = messenger.init();
    assert_eq!(messenger.permission(), Permission::Pending);
    let second = messenger.init();

    assert_eq!(first.await.unwrap(), Permission::Granted);
    assert_eq!(second.await.unwrap(), Permission::Granted);
    assert!(messenger.require_permission().is_ok());
}

#[tokio::test]
async fn granted_send_reaches_the_platform() {
    let platform = Arc::new(RecordingPlatform::granted());
    let messenger = granted_messenger(&platform, MessengerConfig::default()).await;

    let options = NotificationOptions::new().icon("mail").body("You have mail");
    let outcome = messenger.send("Inbox", options.clone()).await;

    assert_eq!(outcome, SendOutcome::Delivered(NotificationId(1)));
    let shown = platform.shown.lock().unwrap().clone();
    assert_eq!(
        shown,
        vec![(NotificationId(1), NotificationMessage::new("Inbox", options))]
    );
}

#[tokio::test]
async fn handlers_are_attached_at_send_time() {
    let platform = Arc::new(RecordingPlatform::granted());
    let messenger = granted_messenger(&platform, MessengerConfig::default()).await;
    let clicks = Arc::new(AtomicUsize::new(0));

    messenger.on("click", counter_handler(&clicks)).await;
    let SendOutcome::Delivered(with_handler) =
        messenger.send("first", NotificationOptions::new()).await
    else {
        panic!("first notification was not delivered");
    };

    messenger.off("click").await;
    let SendOutcome::Delivered(without_handler) =
        messenger.send("second", NotificationOptions::new()).await
    else {
        panic!("second notification was not delivered");
    };

    messenger
        .dispatch_event(PlatformEvent::new(without_handler, NotificationEvent::Click))
        .await;
    assert_eq!(clicks.load(Ordering::SeqCst), 0);

    messenger
        .dispatch_event(PlatformEvent::new(with_handler, NotificationEvent::Click))
        .await;
    assert_eq!(clicks.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn handlers_see_the_delivered_message() {
    let platform = Arc::new(RecordingPlatform::granted());
    let messenger = granted_messenger(&platform, MessengerConfig::default()).await;
    let seen = Arc::new(Mutex::new(Vec::new()));

    let recorder = seen.clone();
    messenger
        .on("show", move |context: &EventContext<'_>| {
            recorder
                .lock()
                .unwrap()
                .push((context.event.clone(), context.message.title.clone()));
        })
        .await;
    let SendOutcome::Delivered(id) = messenger.send("hello", NotificationOptions::new()).await
    else {
        panic!("notification was not delivered");
    };
    messenger.dispatch_event(PlatformEvent::new(id, "show")).await;

    assert_eq!(
        *seen.lock().unwrap(),
        vec![(NotificationEvent::Show, "hello".to_string())]
    );
}

#[tokio::test]
async fn close_releases_the_notification() {
    let platform = Arc::new(RecordingPlatform::granted());
    let messenger = granted_messenger(&platform, MessengerConfig::default()).await;
    let closes = Arc::new(AtomicUsize::new(0));
    let clicks = Arc::new(AtomicUsize::new(0));

    messenger
        .on("close", counter_handler(&closes))
        .await
        .on("click", counter_handler(&clicks))
        .await;
    let SendOutcome::Delivered(id) = messenger.send("bye", NotificationOptions::new()).await else {
        panic!("notification was not delivered");
    };

    messenger.dispatch_event(PlatformEvent::new(id, "close")).await;
    messenger.dispatch_event(PlatformEvent::new(id, "click")).await;
    messenger.dispatch_event(PlatformEvent::new(id, "close")).await;

    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert_eq!(clicks.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn platform_failure_invokes_the_error_handler() {
    let platform = Arc::new(RecordingPlatform {
        fail: true,
        ..RecordingPlatform::granted()
    });
    let messenger = granted_messenger(&platform, MessengerConfig::default()).await;
    let errors = Arc::new(AtomicUsize::new(0));

    messenger.on("error", counter_handler(&errors)).await;
    let outcome = messenger.send("broken", NotificationOptions::new()).await;

    assert_eq!(outcome, SendOutcome::Failed(NotificationId(1)));
    assert_eq!(errors.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn silent_platform_keeps_no_handlers_around() {
    let platform = Arc::new(RecordingPlatform {
        reports: false,
        ..RecordingPlatform::granted()
    });
    let messenger = granted_messenger(&platform, MessengerConfig::default()).await;
    let clicks = Arc::new(AtomicUsize::new(0));

    messenger.on("click", counter_handler(&clicks)).await;
    for index in 0..10_000 {
        let outcome = messenger.send(format!("#{index}"), NotificationOptions::new()).await;
        assert!(matches!(outcome, SendOutcome::Delivered(_)));
    }

    assert_eq!(messenger.tracked().await, 0);
    assert_eq!(platform.shown.lock().unwrap().len(), 10_000);
}

#[tokio::test]
async fn notifications_without_handlers_are_not_tracked() {
    let platform = Arc::new(RecordingPlatform::granted());
    let messenger = granted_messenger(&platform, MessengerConfig::default()).await;

    messenger.send("plain", NotificationOptions::new()).await;
    assert_eq!(messenger.tracked().await, 0);

    messenger.on("close", |_: &EventContext<'_>| {}).await;
    messenger.send("watched", NotificationOptions::new()).await;
    assert_eq!(messenger.tracked().await, 1);
}

#[tokio::test]
async fn tracked_notifications_are_bounded() {
    let platform = Arc::new(RecordingPlatform::granted());
    let mut config = MessengerConfig::default();
    config.set("maxTrackedNotifications", 3i64).unwrap();
    let messenger = granted_messenger(&platform, config).await;
    let clicks = Arc::new(AtomicUsize::new(0));

    messenger.on("click", counter_handler(&clicks)).await;
    for index in 0..1_000 {
        messenger.send(format!("#{index}"), NotificationOptions::new()).await;
    }
    assert_eq!(messenger.tracked().await, 3);

    messenger
        .dispatch_event(PlatformEvent::new(NotificationId(1), "click"))
        .await;
    assert_eq!(clicks.load(Ordering::SeqCst), 0);

    messenger
        .dispatch_event(PlatformEvent::new(NotificationId(1_000), "click"))
        .await;
    assert_eq!(clicks.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn silent_platform_failure_still_invokes_the_error_handler() {
    let platform = Arc::new(RecordingPlatform {
        fail: true,
        reports: false,
        ..RecordingPlatform::granted()
    });
    let messenger = granted_messenger(&platform, MessengerConfig::default()).await;
    let errors = Arc::new(AtomicUsize::new(0));

    messenger.on("error", counter_handler(&errors)).await;
    let outcome = messenger.send("broken", NotificationOptions::new()).await;

    assert_eq!(outcome, SendOutcome::Failed(NotificationId(1)));
    assert_eq!(errors.load(Ordering::SeqCst), 1);
    assert_eq!(messenger.tracked().await, 0);
}

#[tokio::test(start_paused = true)]
async fn always_true_default_trigger_drains_in_one_pass() {
    let platform = Arc::new(RecordingPlatform::granted());
    let messenger = granted_messenger(&platform, config(100, None)).await;

    messenger
        .queue("a", NotificationOptions::new())
        .await
        .queue("b", NotificationOptions::new())
        .await
        .queue("c", NotificationOptions::new())
        .await;
    let summary = messenger.drain(always(true)).unwrap().join().await.unwrap();

    assert_eq!(
        summary,
        DrainSummary {
            passes: 1,
            sent: 3,
            remaining: 0,
            stop: DrainStop::Emptied,
        }
    );
    assert_eq!(platform.titles(), ["a", "b", "c"]);
    assert_eq!(messenger.pending().await, 0);
}

#[tokio::test(start_paused = true)]
async fn item_trigger_keeps_its_item_queued() {
    let platform = Arc::new(RecordingPlatform::granted());
    let messenger = granted_messenger(&platform, config(50, Some(2))).await;

    messenger
        .queue("A", NotificationOptions::new().icon("i").body("b"))
        .await
        .queue_with_trigger("B", NotificationOptions::new(), || false)
        .await;
    let summary = messenger.drain(always(true)).unwrap().join().await.unwrap();

    assert_eq!(summary.passes, 2);
    assert_eq!(summary.sent, 1);
    assert_eq!(summary.remaining, 1);
    assert_eq!(summary.stop, DrainStop::PassLimit);
    assert_eq!(platform.titles(), ["A"]);

    let queued: Vec<_> = messenger
        .queued_messages()
        .await
        .into_iter()
        .map(|message| message.title)
        .collect();
    assert_eq!(queued, ["B"]);
}

#[tokio::test(start_paused = true)]
async fn trigger_turning_true_is_picked_up_by_a_later_pass() {
    let platform = Arc::new(RecordingPlatform::granted());
    let messenger = granted_messenger(&platform, config(100, None)).await;
    let mut evaluations = 0;

    messenger
        .queue_with_trigger("eventually", NotificationOptions::new(), move || {
            evaluations += 1;
            evaluations == 4
        })
        .await;
    let started = tokio::time::Instant::now();
    let summary = messenger.drain(None).unwrap().join().await.unwrap();

    assert_eq!(summary.passes, 4);
    assert_eq!(summary.stop, DrainStop::Emptied);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(300), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(400), "{elapsed:?}");
    assert_eq!(platform.titles(), ["eventually"]);
}

#[tokio::test(start_paused = true)]
async fn false_trigger_keeps_polling_until_cancelled() {
    let platform = Arc::new(RecordingPlatform::granted());
    let messenger = granted_messenger(&platform, config(100, None)).await;

    messenger
        .queue("a", NotificationOptions::new())
        .await
        .queue("b", NotificationOptions::new())
        .await;
    let handle = messenger.drain(always(false)).unwrap();

    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(!handle.is_finished());
    handle.cancel();
    let summary = handle.join().await.unwrap();

    assert_eq!(summary.stop, DrainStop::Cancelled);
    assert_eq!(summary.passes, 4);
    assert_eq!(summary.sent, 0);
    assert_eq!(summary.remaining, 2);
    assert!(platform.titles().is_empty());
    assert_eq!(messenger.pending().await, 2);
}

#[tokio::test(start_paused = true)]
async fn only_one_drain_runs_at_a_time() {
    let platform = Arc::new(RecordingPlatform::granted());
    let messenger = granted_messenger(&platform, config(100, None)).await;
    messenger.queue("stuck", NotificationOptions::new()).await;

    let handle = messenger.drain(always(false)).unwrap();
    assert!(matches!(
        messenger.drain(always(true)),
        Err(MessengerError::DrainInProgress)
    ));

    handle.cancel();
    handle.join().await.unwrap();

    let summary = messenger.drain(always(true)).unwrap().join().await.unwrap();
    assert_eq!(summary.sent, 1);
    assert_eq!(platform.titles(), ["stuck"]);
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_a_running_drain() {
    let platform = Arc::new(RecordingPlatform::granted());
    let messenger = granted_messenger(&platform, config(100, None)).await;
    messenger.queue("never", NotificationOptions::new()).await;

    let handle = messenger.drain(always(false)).unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    messenger.shutdown();

    let summary = handle.join().await.unwrap();
    assert_eq!(summary.stop, DrainStop::Cancelled);
    assert_eq!(summary.remaining, 1);
}

#[tokio::test(start_paused = true)]
async fn pending_permission_holds_queued_items() {
    let release = Arc::new(Notify::new());
    let platform = Arc::new(RecordingPlatform {
        release: Some(release.clone()),
        ..RecordingPlatform::asking(Permission::Granted)
    });
    let messenger = Messenger::new(platform.clone(), config(100, None)).unwrap();

    let permission = messenger.init();
    messenger.queue("held", NotificationOptions::new()).await;
    let handle = messenger.drain(None).unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(messenger.permission(), Permission::Pending);
    assert_eq!(messenger.pending().await, 1);
    assert!(platform.titles().is_empty());

    release.notify_one();
    assert_eq!(permission.await.unwrap(), Permission::Granted);
    let summary = handle.join().await.unwrap();

    assert_eq!(summary.stop, DrainStop::Emptied);
    assert_eq!(platform.titles(), ["held"]);
}

#[tokio::test(start_paused = true)]
async fn denied_permission_still_removes_due_items() {
    let platform = Arc::new(RecordingPlatform::asking(Permission::Denied));
    let messenger = Messenger::new(platform.clone(), config(100, None)).unwrap();
    assert_eq!(messenger.init().await.unwrap(), Permission::Denied);

    messenger.queue("dropped", NotificationOptions::new()).await;
    let summary = messenger.drain(None).unwrap().join().await.unwrap();

    assert_eq!(summary.sent, 1);
    assert_eq!(summary.stop, DrainStop::Emptied);
    assert!(platform.titles().is_empty());
    assert_eq!(messenger.pending().await, 0);
}

#[tokio::test(start_paused = true)]
async fn unrequested_permission_removes_due_items_without_sending() {
    let platform = Arc::new(RecordingPlatform::asking(Permission::Granted));
    let messenger = Messenger::new(platform.clone(), config(100, None)).unwrap();

    messenger.queue("unsent", NotificationOptions::new()).await;
    let summary = messenger.drain(None).unwrap().join().await.unwrap();

    assert_eq!(messenger.permission(), Permission::Unset);
    assert_eq!(summary.sent, 1);
    assert_eq!(summary.stop, DrainStop::Emptied);
    assert!(platform.titles().is_empty());
    assert_eq!(messenger.pending().await, 0);
}

#[tokio::test]
async fn configuration_is_validated_and_extensible() {
    let platform = Arc::new(RecordingPlatform::granted());
    let messenger = Messenger::new(platform, MessengerConfig::default()).unwrap();

    messenger
        .set_config("queueTimeout", 20i64)
        .await
        .unwrap()
        .add_config([("theme", ConfigValue::from("dark")), ("volume", ConfigValue::from(0.5))])
        .await
        .unwrap();

    assert_eq!(messenger.config("queueTimeout").await, Some(ConfigValue::Integer(20)));
    assert_eq!(messenger.config("theme").await, Some(ConfigValue::from("dark")));
    assert_eq!(messenger.config("volume").await, Some(ConfigValue::Float(0.5)));

    let error = messenger.set_config("queueTimeout", "later").await;
    assert!(matches!(error, Err(MessengerError::Configuration(_))));
    assert_eq!(messenger.configuration().await.queue_timeout, 20);
}

#[tokio::test(start_paused = true)]
async fn platform_events_reach_handlers_through_the_channel() {
    let channels = EventChannels::default();
    let platform = Arc::new(RecordingPlatform::granted());
    let messenger =
        messenger_backend::start(platform.clone(), MessengerConfig::default(), channels.messenger_rx)
            .unwrap();
    let clicks = Arc::new(AtomicUsize::new(0));

    messenger.on("click", counter_handler(&clicks)).await;
    let SendOutcome::Delivered(id) = messenger.send("ping", NotificationOptions::new()).await
    else {
        panic!("notification was not delivered");
    };

    channels
        .platform_tx
        .send(PlatformEvent::new(id, "click"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(clicks.load(Ordering::SeqCst), 1);
    messenger.shutdown();
}

#[tokio::test]
async fn event_loop_stops_when_cancelled() {
    let channels = EventChannels::default();
    let platform = Arc::new(RecordingPlatform::granted());
    let messenger = granted_messenger(&platform, MessengerConfig::default()).await;
    let cancel = CancellationToken::new();

    let consumer = messenger.clone();
    let token = cancel.clone();
    let events = channels.messenger_rx;
    let task = tokio::spawn(async move { consumer.consume_platform_events(events, token).await });

    cancel.cancel();
    task.await.unwrap();
    assert!(channels.platform_tx.is_closed());
}
