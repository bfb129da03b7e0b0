use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default delay between two drain passes of the send queue, in milliseconds.
pub const DEFAULT_QUEUE_TIMEOUT_MS: u64 = 1000;

/// Default number of sent notifications whose handlers are kept until the
/// platform reports them closed.
pub const DEFAULT_MAX_TRACKED_NOTIFICATIONS: usize = 256;

/// Default application name reported to the notification server.
pub const DEFAULT_APP_NAME: &str = "messenger";

/// Errors returned when a configuration value does not fit the key it is
/// assigned to.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    /// The key is recognized, but the value has the wrong shape or range.
    #[error("invalid value for `{key}`: expected {expected}")]
    InvalidValue {
        key: String,
        expected: &'static str,
    },
}

/// A single configuration value. Any key accepts any of these shapes, but
/// recognized keys are checked when they are assigned.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Integer(value)
    }
}

impl From<u32> for ConfigValue {
    fn from(value: u32) -> Self {
        ConfigValue::Integer(value.into())
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Float(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::String(value)
    }
}

/// Keys with a defined effect on the messenger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecognizedKey {
    QueueTimeout,
    MaxDrainPasses,
    MaxTrackedNotifications,
    AppName,
}

impl RecognizedKey {
    /// Accepts both the camelCase API spelling and the snake_case file spelling.
    fn parse(key: &str) -> Option<Self> {
        match key {
            "queueTimeout" | "queue_timeout" => Some(RecognizedKey::QueueTimeout),
            "maxDrainPasses" | "max_drain_passes" => Some(RecognizedKey::MaxDrainPasses),
            "maxTrackedNotifications" | "max_tracked_notifications" => {
                Some(RecognizedKey::MaxTrackedNotifications)
            }
            "appName" | "app_name" => Some(RecognizedKey::AppName),
            _ => None,
        }
    }
}

/// Messenger configuration.
///
/// Recognized keys are typed fields; every other key is stored verbatim in
/// [`MessengerConfig::extra`] and has no effect.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MessengerConfig {
    /// Delay between two drain passes of the send queue, in milliseconds.
    #[serde(alias = "queueTimeout")]
    pub queue_timeout: u64,
    /// Upper bound on drain passes per drain loop. `None` polls until the
    /// queue is empty or the loop is cancelled.
    #[serde(alias = "maxDrainPasses", skip_serializing_if = "Option::is_none")]
    pub max_drain_passes: Option<u32>,
    /// How many sent notifications keep their handlers while waiting for a
    /// terminal event. The oldest one is forgotten past this bound.
    #[serde(alias = "maxTrackedNotifications")]
    pub max_tracked_notifications: usize,
    /// Application name passed to the desktop notification server.
    #[serde(alias = "appName")]
    pub app_name: String,
    /// Keys without a defined effect.
    #[serde(flatten)]
    pub extra: BTreeMap<String, ConfigValue>,
}

impl Default for MessengerConfig {
    fn default() -> Self {
        Self {
            queue_timeout: DEFAULT_QUEUE_TIMEOUT_MS,
            max_drain_passes: None,
            max_tracked_notifications: DEFAULT_MAX_TRACKED_NOTIFICATIONS,
            app_name: DEFAULT_APP_NAME.to_string(),
            extra: BTreeMap::new(),
        }
    }
}

impl MessengerConfig {
    /// Delay between two drain passes.
    pub fn queue_timeout(&self) -> Duration {
        Duration::from_millis(self.queue_timeout)
    }

    /// Reads the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<ConfigValue> {
        match RecognizedKey::parse(key) {
            Some(RecognizedKey::QueueTimeout) => Some(ConfigValue::Integer(
                i64::try_from(self.queue_timeout).unwrap_or(i64::MAX),
            )),
            Some(RecognizedKey::MaxDrainPasses) => self.max_drain_passes.map(ConfigValue::from),
            Some(RecognizedKey::MaxTrackedNotifications) => Some(ConfigValue::Integer(
                i64::try_from(self.max_tracked_notifications).unwrap_or(i64::MAX),
            )),
            Some(RecognizedKey::AppName) => Some(ConfigValue::String(self.app_name.clone())),
            None => self.extra.get(key).cloned(),
        }
    }

    /// Stores `value` under `key`. Recognized keys are validated and the
    /// configuration is left untouched when the value does not fit.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<ConfigValue>,
    ) -> Result<(), ConfigurationError> {
        let key = key.into();
        let value = value.into();

        match RecognizedKey::parse(&key) {
            Some(RecognizedKey::QueueTimeout) => {
                self.queue_timeout = match value {
                    ConfigValue::Integer(timeout) => u64::try_from(timeout).ok(),
                    _ => None,
                }
                .ok_or(ConfigurationError::InvalidValue {
                    key,
                    expected: "a non-negative integer of milliseconds",
                })?;
            }
            Some(RecognizedKey::MaxDrainPasses) => {
                let passes = match value {
                    ConfigValue::Integer(passes) => u32::try_from(passes).ok().filter(|p| *p > 0),
                    _ => None,
                }
                .ok_or(ConfigurationError::InvalidValue {
                    key,
                    expected: "a positive integer",
                })?;
                self.max_drain_passes = Some(passes);
            }
            Some(RecognizedKey::MaxTrackedNotifications) => {
                self.max_tracked_notifications = match value {
                    ConfigValue::Integer(limit) => usize::try_from(limit).ok().filter(|l| *l > 0),
                    _ => None,
                }
                .ok_or(ConfigurationError::InvalidValue {
                    key,
                    expected: "a positive integer",
                })?;
            }
            Some(RecognizedKey::AppName) => match value {
                ConfigValue::String(name) => self.app_name = name,
                _ => {
                    return Err(ConfigurationError::InvalidValue {
                        key,
                        expected: "a string",
                    });
                }
            },
            None => {
                self.extra.insert(key, value);
            }
        }

        Ok(())
    }

    /// Stores several entries at once. Either every entry is applied, or none
    /// of them is.
    pub fn extend<K, V>(
        &mut self,
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Result<(), ConfigurationError>
    where
        K: Into<String>,
        V: Into<ConfigValue>,
    {
        let mut updated = self.clone();
        for (key, value) in entries {
            updated.set(key, value)?;
        }
        *self = updated;
        Ok(())
    }
}
