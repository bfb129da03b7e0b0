//! Notification service entry point and public API surface.
//!
//! This crate owns the messenger lifecycle: it checks that notifications are
//! supported, requests permission once, sends notifications with the event
//! handlers attached at send time, and drains a queue of notifications that
//! wait for their trigger.

mod app;
mod config;
mod error;
mod events;
mod permission;
mod queue;
mod runtime;
mod state;

pub use crate::app::{Messenger, SendOutcome};
pub use crate::config::{
    ConfigError, default_config_path, load_config, load_config_from, save_config_to,
};
pub use crate::error::MessengerError;
pub use crate::events::{AttachedHandlers, EventContext, EventHandler, EventRegistry};
pub use crate::permission::PermissionGate;
pub use crate::queue::{NotificationQueue, PassOutcome, QueueItem, Trigger};
pub use crate::runtime::{DrainHandle, DrainStop, DrainSummary, start};
