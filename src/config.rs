//! # System Configuration
//!
//! Deserializable settings for an [`ActorSystem`](crate::system::ActorSystem).

use serde::Deserialize;

/// Tunables applied to every actor the system spawns unless overridden at
/// spawn time.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Name used in log fields and anonymous actor names.
    pub name: String,
    /// Default inbox quota. `None` leaves inboxes unbounded; bounding is
    /// opt-in per actor.
    pub default_quota: Option<usize>,
    /// Priority of ordinary mailbox traffic in the shared ordering domain.
    pub worker_priority: i32,
    /// Priority of control/supervision actors; must outrank
    /// `worker_priority` for supervision traffic to preempt.
    pub control_priority: i32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            name: "agentry".to_string(),
            default_quota: None,
            worker_priority: 0,
            control_priority: 10,
        }
    }
}
