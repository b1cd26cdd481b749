//! # Supervision
//!
//! When a behavior hook fails, the actor suspends (queueing, not dropping,
//! further messages) and notifies its supervisor with a
//! [`SupervisedFailure`]. The supervisor answers with a directive — resume,
//! restart, or stop — keyed by the failure id so stale answers are ignored.
//! An actor without a supervisor stops immediately.

use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;

use crate::behavior::{Agent, Behavior};
use crate::envelope::{msg, Envelope, Message, Options};
use crate::error::BehaviorError;
use crate::mailbox::ActorRef;

/// Identifies one outstanding failure of one actor. Only one failure can be
/// outstanding per actor at a time; a recovery carrying any other id is
/// stale and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FailureId(pub(crate) u64);

impl std::fmt::Display for FailureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failure-{}", self.0)
    }
}

/// Recovery decision issued by a supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Return to running; queued messages are delivered in original order
    /// and behavior state is untouched.
    Resume,
    /// `on_stop`, fresh behavior instance, `on_start`, then the queued
    /// messages.
    Restart,
    /// `on_stop`, then stop for good; queued messages are bounced.
    Stop,
}

/// Sent to an actor's supervisor when one of its hooks fails.
#[derive(Clone)]
pub struct SupervisedFailure {
    /// The failed actor; recoveries go back through this reference.
    pub actor: ActorRef,
    pub failure: FailureId,
    pub cause: Arc<dyn Error + Send + Sync>,
}

impl std::fmt::Debug for SupervisedFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupervisedFailure")
            .field("actor", &self.actor)
            .field("failure", &self.failure)
            .field("cause", &self.cause.to_string())
            .finish()
    }
}

/// A supervisor's answer. May be sent as an ordinary message to the failed
/// actor — the dispatcher intercepts it ahead of the mailbox — or applied
/// directly through [`ActorRef::recover`].
#[derive(Debug, Clone, Copy)]
pub struct SupervisedRecovery {
    pub failure: FailureId,
    pub directive: Directive,
}

/// A ready-made supervisor behavior that answers every failure with the same
/// directive. Useful on its own for blanket policies, and as the template
/// for richer supervisors (count failures, escalate, back off).
pub struct StaticSupervisor {
    directive: Directive,
}

impl StaticSupervisor {
    pub fn new(directive: Directive) -> Self {
        Self { directive }
    }
}

#[async_trait]
impl Behavior for StaticSupervisor {
    async fn on_message(
        &mut self,
        message: Message,
        _envelope: &Envelope,
        agent: &mut Agent,
    ) -> Result<(), BehaviorError> {
        if let Some(failure) = message.downcast_ref::<SupervisedFailure>() {
            agent.logger().warn(
                &format!(
                    "supervised actor '{}' failed ({}), answering {:?}",
                    failure.actor.name(),
                    failure.failure,
                    self.directive
                ),
                Some(failure.cause.as_ref()),
            );
            failure.actor.tell(
                msg(SupervisedRecovery {
                    failure: failure.failure,
                    directive: self.directive,
                }),
                Options::new(),
                Some(agent.self_ref()),
            );
        }
        Ok(())
    }
}
