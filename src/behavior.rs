//! # Behavior
//!
//! The per-actor state machine: `on_start` runs before the first message,
//! `on_message` handles one delivery at a time, `on_stop` runs on dismissal,
//! restart, or fatal failure. All three return `Result`; an `Err` is an
//! uncaught handler failure and routes through supervision.
//!
//! # Concurrency Model
//! A behavior is only ever touched from its own actor's dispatch task, which
//! runs on a bounded executor with concurrency 1. Invocations never overlap,
//! so behaviors need no internal locking.

use std::sync::Arc;

use async_trait::async_trait;

use crate::envelope::{Envelope, Message};
use crate::error::BehaviorError;
use crate::executor::TaskExecutor;
use crate::logging::ActorLogger;
use crate::mailbox::{ActorCell, ActorRef};

/// The state machine currently governing an actor.
///
/// Implementations may be swapped at runtime with
/// [`Agent::set_behavior`]; the replacement governs the *next* message,
/// never the one in flight.
#[async_trait]
pub trait Behavior: Send + 'static {
    /// Invoked once, before the first message is delivered, and again after
    /// a supervision `Restart` or [`Agent::restart_self`]. A failure here is
    /// a supervised failure; the triggering message stays queued.
    async fn on_start(&mut self, _agent: &mut Agent) -> Result<(), BehaviorError> {
        Ok(())
    }

    /// Handles one delivered message.
    async fn on_message(
        &mut self,
        message: Message,
        envelope: &Envelope,
        agent: &mut Agent,
    ) -> Result<(), BehaviorError>;

    /// Invoked on dismissal, restart, or supervised stop. Errors are logged,
    /// never re-raised.
    async fn on_stop(&mut self, _agent: &mut Agent) -> Result<(), BehaviorError> {
        Ok(())
    }
}

/// Produces behavior instances. Held by every actor so a supervision
/// `Restart` can obtain a fresh instance.
pub type BehaviorFactory = Box<dyn FnMut() -> Box<dyn Behavior> + Send>;

/// Adapts a plain closure into a message-only [`Behavior`], for actors with
/// no lifecycle hooks of their own.
pub fn from_fn<F>(f: F) -> FnBehavior<F>
where
    F: FnMut(Message, &Envelope, &mut Agent) -> Result<(), BehaviorError> + Send + 'static,
{
    FnBehavior(f)
}

pub struct FnBehavior<F>(F);

#[async_trait]
impl<F> Behavior for FnBehavior<F>
where
    F: FnMut(Message, &Envelope, &mut Agent) -> Result<(), BehaviorError> + Send + 'static,
{
    async fn on_message(
        &mut self,
        message: Message,
        envelope: &Envelope,
        agent: &mut Agent,
    ) -> Result<(), BehaviorError> {
        (self.0)(message, envelope, agent)
    }
}

/// Lifecycle request a behavior issued through its [`Agent`]; applied by the
/// dispatcher after the current hook returns, never re-entrantly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AgentEffect {
    Restart,
    Dismiss,
}

/// The capability object handed to every behavior hook.
///
/// Everything an actor may do to itself goes through here — there is no
/// ambient "current actor" state anywhere in the runtime, so dispatch tasks
/// are free to hop worker threads between cycles.
pub struct Agent {
    cell: Arc<ActorCell>,
    effect: Option<AgentEffect>,
}

impl Agent {
    pub(crate) fn new(cell: Arc<ActorCell>) -> Self {
        Self { cell, effect: None }
    }

    pub(crate) fn take_effect(&mut self) -> Option<AgentEffect> {
        self.effect.take()
    }

    /// A reference to this actor, suitable for handing to other actors.
    pub fn self_ref(&self) -> ActorRef {
        ActorRef::from_cell(self.cell.clone())
    }

    /// Replaces this actor's behavior starting with the next message. The
    /// message currently in flight finishes under the old behavior.
    pub fn set_behavior(&mut self, behavior: Box<dyn Behavior>) {
        self.cell.set_replacement(behavior);
    }

    /// Requests `on_stop` followed immediately by `on_start`, on this same
    /// still-live actor, after the current hook returns.
    pub fn restart_self(&mut self) {
        self.effect = Some(AgentEffect::Restart);
    }

    /// Requests dismissal after the current hook returns. Equivalent to an
    /// external [`ActorRef::dismiss`] without interruption.
    pub fn dismiss_self(&mut self) {
        self.effect = Some(AgentEffect::Dismiss);
    }

    /// Whether this actor has been dismissed or stopped.
    pub fn is_dismissed(&self) -> bool {
        self.cell.is_terminal()
    }

    /// The logging sink scoped to this actor.
    pub fn logger(&self) -> &ActorLogger {
        self.cell.logger()
    }

    /// This actor's own executor capability (bounded, concurrency 1).
    pub fn executor(&self) -> Arc<dyn TaskExecutor> {
        self.cell.executor_capability()
    }
}
