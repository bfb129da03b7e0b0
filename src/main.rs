use std::sync::Arc;
use std::time::Duration;

use messenger_backend::EventContext;
use messenger_bridge::EventChannels;
use messenger_bridge::notification::NotificationOptions;
use messenger_platform::desktop::DesktopPlatform;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    simple_logger::SimpleLogger::new()
        .with_colors(true)
        .with_threads(true)
        .with_local_timestamps()
        .init()?;

    let config = messenger_backend::load_config().await?;
    let channels = EventChannels::default();
    let platform =
        DesktopPlatform::new(config.app_name.clone()).with_events(channels.platform_tx);
    log::info!("Using {platform}");

    let messenger = messenger_backend::start(Arc::new(platform), config, channels.messenger_rx)?;
    messenger
        .on("click", |context: &EventContext<'_>| {
            log::info!("Notification {} ({:?}) was clicked", context.id, context.message.title);
        })
        .await
        .on("close", |context: &EventContext<'_>| {
            log::info!("Notification {} was closed", context.id);
        })
        .await;

    let outcome = messenger
        .send(
            "Messenger is running",
            NotificationOptions::new().body("Queued reminders follow shortly."),
        )
        .await;
    log::info!("Startup notification: {outcome:?}");

    let started = tokio::time::Instant::now();
    messenger
        .queue(
            "Queued right away",
            NotificationOptions::new().body("Sent on the first drain pass."),
        )
        .await
        .queue_with_trigger(
            "Five seconds later",
            NotificationOptions::new()
                .icon("appointment-soon")
                .body("Sent once its trigger allowed it."),
            move || started.elapsed() >= Duration::from_secs(5),
        )
        .await;

    let drain = messenger.drain(None)?;
    tokio::select! {
        summary = drain.join() => log::info!("Queue drained: {:?}", summary?),
        signal = tokio::signal::ctrl_c() => {
            signal?;
            log::info!("Interrupted, stopping");
        }
    }

    messenger.shutdown();
    Ok(())
}
