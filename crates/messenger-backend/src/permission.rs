//! Per-messenger permission state with a single resolution point.

use std::sync::Arc;

use messenger_bridge::permission::Permission;
use tokio::sync::watch;

/// Owns the permission state of one messenger.
///
/// The state only moves forward: `Unset -> Pending -> Granted | Denied`.
/// Once resolved it never changes again. Clones share the same state.
#[derive(Debug, Clone)]
pub struct PermissionGate {
    state: Arc<watch::Sender<Permission>>,
}

impl Default for PermissionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionGate {
    pub fn new() -> Self {
        let (state, _) = watch::channel(Permission::Unset);
        Self {
            state: Arc::new(state),
        }
    }

    /// Current permission state.
    pub fn state(&self) -> Permission {
        *self.state.borrow()
    }

    /// Marks a request as in flight. Returns `false` if a request was already
    /// issued or answered.
    pub fn begin(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == Permission::Unset {
                *state = Permission::Pending;
                true
            } else {
                false
            }
        })
    }

    /// Records the answer to the permission request. Only the first answer is
    /// kept; later ones are ignored and `false` is returned.
    pub fn resolve(&self, answer: Permission) -> bool {
        if !answer.is_resolved() {
            log::warn!("Ignoring permission answer {answer}: not a resolution");
            return false;
        }

        let resolved = self.state.send_if_modified(|state| {
            if state.is_resolved() {
                false
            } else {
                *state = answer;
                true
            }
        });
        if !resolved {
            log::warn!(
                "Permission already resolved as {}, ignoring {answer}",
                self.state()
            );
        }
        resolved
    }

    /// Waits until the permission is either granted or denied.
    pub async fn resolved(&self) -> Permission {
        let mut receiver = self.state.subscribe();
        match receiver.wait_for(|state| state.is_resolved()).await {
            Ok(state) => *state,
            // the sender lives as long as `self`, so this is unreachable in practice
            Err(_) => self.state(),
        }
    }
}
