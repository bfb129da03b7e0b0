use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier assigned to a notification when it is handed to the platform.
///
/// Lifecycle events reported by the platform carry this id so they can be
/// routed back to the handlers attached at send time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationId(pub u64);

impl fmt::Display for NotificationId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "#{}", self.0)
    }
}

/// Presentation options of a notification.
///
/// Both fields default to an empty string; an empty icon means "no icon".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationOptions {
    /// Path or name of the icon shown next to the notification.
    pub icon: String,
    /// The text content displayed under the title.
    pub body: String,
}

impl NotificationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }
}

/// A notification payload: the title plus its presentation options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct NotificationMessage {
    pub title: String,
    pub options: NotificationOptions,
}

impl NotificationMessage {
    pub fn new(title: impl Into<String>, options: NotificationOptions) -> Self {
        Self {
            title: title.into(),
            options,
        }
    }
}

/// Lifecycle event of a delivered notification.
///
/// Event names are not validated: any name that is not one of the well-known
/// events is kept as [`NotificationEvent::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NotificationEvent {
    /// The user activated the notification.
    Click,
    /// The notification was dismissed or expired.
    Close,
    /// The platform failed to display the notification.
    Error,
    /// The notification was displayed.
    Show,
    Other(String),
}

impl NotificationEvent {
    pub fn as_str(&self) -> &str {
        match self {
            NotificationEvent::Click => "click",
            NotificationEvent::Close => "close",
            NotificationEvent::Error => "error",
            NotificationEvent::Show => "show",
            NotificationEvent::Other(name) => name,
        }
    }

    /// Whether the notification is finished after this event, so its attached
    /// handlers can be released.
    pub fn is_terminal(&self) -> bool {
        matches!(self, NotificationEvent::Close | NotificationEvent::Error)
    }
}

impl From<&str> for NotificationEvent {
    fn from(name: &str) -> Self {
        match name {
            "click" => NotificationEvent::Click,
            "close" => NotificationEvent::Close,
            "error" => NotificationEvent::Error,
            "show" => NotificationEvent::Show,
            other => NotificationEvent::Other(other.to_string()),
        }
    }
}

impl From<String> for NotificationEvent {
    fn from(name: String) -> Self {
        NotificationEvent::from(name.as_str())
    }
}

impl fmt::Display for NotificationEvent {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
