//! # Runtime Errors
//!
//! Errors surfaced by the runtime itself. Message rejection is *not* an
//! error: it travels back to the sender as a [`Bounce`](crate::signal::Bounce)
//! signal. These types cover the fail-fast construction surface instead.

/// Failure payload produced by a [`Behavior`](crate::behavior::Behavior)
/// hook. An `Err` here is what routes a message through supervision.
pub type BehaviorError = Box<dyn std::error::Error + Send + Sync>;

/// Errors from registering an actor with the system.
#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    #[error("actor name '{0}' is already registered")]
    DuplicateName(String),
    #[error("actor system is shut down")]
    SystemShutdown,
}
