//! # Logging
//!
//! Tracing setup plus the per-actor logger sink handed out through
//! [`Agent::logger`](crate::behavior::Agent::logger). Behaviors log through
//! the sink rather than importing a logging facade themselves, so the
//! runtime controls the fields every line carries.

use std::error::Error;

use tracing::Level;

/// Initializes the tracing/logging infrastructure.
///
/// Filtering is controlled through the `RUST_LOG` environment variable, e.g.
/// `RUST_LOG=agentry=debug`.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

/// A three-level logging sink scoped to one actor.
///
/// Every line carries the actor's name; causes are appended when present.
/// The `*_enabled` predicates let callers skip expensive message formatting
/// when a level is filtered out.
#[derive(Clone)]
pub struct ActorLogger {
    actor: std::sync::Arc<str>,
}

impl ActorLogger {
    pub fn new(actor: &str) -> Self {
        Self {
            actor: actor.into(),
        }
    }

    pub fn debug(&self, message: &str, cause: Option<&dyn Error>) {
        match cause {
            Some(cause) => tracing::debug!(actor = %self.actor, %cause, "{message}"),
            None => tracing::debug!(actor = %self.actor, "{message}"),
        }
    }

    pub fn warn(&self, message: &str, cause: Option<&dyn Error>) {
        match cause {
            Some(cause) => tracing::warn!(actor = %self.actor, %cause, "{message}"),
            None => tracing::warn!(actor = %self.actor, "{message}"),
        }
    }

    pub fn error(&self, message: &str, cause: Option<&dyn Error>) {
        match cause {
            Some(cause) => tracing::error!(actor = %self.actor, %cause, "{message}"),
            None => tracing::error!(actor = %self.actor, "{message}"),
        }
    }

    pub fn debug_enabled(&self) -> bool {
        tracing::enabled!(Level::DEBUG)
    }

    pub fn warn_enabled(&self) -> bool {
        tracing::enabled!(Level::WARN)
    }

    pub fn error_enabled(&self) -> bool {
        tracing::enabled!(Level::ERROR)
    }
}

impl std::fmt::Debug for ActorLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorLogger")
            .field("actor", &self.actor)
            .finish()
    }
}
