use messenger_bridge::config::ConfigurationError;

use crate::config::ConfigError;

/// Errors surfaced by the messenger service.
///
/// Delivery problems are deliberately absent: a send without permission or a
/// platform failure is reported through [`crate::SendOutcome`] and never as
/// an error.
#[derive(Debug, thiserror::Error)]
pub enum MessengerError {
    /// The environment has no notification capability. Reported once, when
    /// the messenger is created.
    #[error("notifications are not supported in this environment")]
    UnsupportedEnvironment,
    /// Returned by [`crate::Messenger::require_permission`] when delivery is
    /// not allowed.
    #[error("notification permission is {0}")]
    PermissionDenied(messenger_bridge::permission::Permission),
    /// A drain loop is already running for this messenger.
    #[error("a drain loop is already running")]
    DrainInProgress,
    /// A configuration value does not fit its key.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// The configuration file could not be read or written.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The drain task panicked or was aborted.
    #[error("drain task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
