use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether the user allowed notifications to be delivered.
///
/// The state moves from [`Permission::Unset`] to [`Permission::Pending`] once
/// a request is in flight, and settles on either [`Permission::Granted`] or
/// [`Permission::Denied`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Permission was never requested.
    #[default]
    Unset,
    /// A request was issued and has not been answered yet.
    Pending,
    Granted,
    Denied,
}

impl Permission {
    pub fn is_granted(self) -> bool {
        self == Permission::Granted
    }

    /// Returns `true` once the request has been answered either way.
    pub fn is_resolved(self) -> bool {
        matches!(self, Permission::Granted | Permission::Denied)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Permission::Unset => "unset",
            Permission::Pending => "pending",
            Permission::Granted => "granted",
            Permission::Denied => "denied",
        };
        formatter.write_str(name)
    }
}
