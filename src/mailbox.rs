//! # Actor Mailbox / Dispatcher
//!
//! This module binds a [`Behavior`] to a bounded-concurrency executor with
//! concurrency 1 plus an inbox quota, serializes message delivery, applies
//! bounce-on-overflow, and drives the behavior state machine through
//! `Created → Running ⇄ Suspended → Stopped`.
//!
//! # Concurrency Model
//! Every accepted message submits one dispatch cycle to the actor's own
//! bounded executor. Because that executor runs at most one cycle at a time,
//! `on_message` invocations for one actor never overlap — even though
//! successive cycles may land on different worker threads of the shared
//! pool. Messages from a given sender are delivered in send order; no
//! ordering holds across senders.

use std::collections::VecDeque;
use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::behavior::{Agent, AgentEffect, Behavior, BehaviorFactory};
use crate::envelope::{msg, Envelope, Message, Options};
use crate::executor::{BoundedExecutor, TaskExecutor};
use crate::logging::ActorLogger;
use crate::signal::{Bounce, BounceReason, Delivery, Failure, Receipt};
use crate::supervision::{Directive, FailureId, SupervisedFailure, SupervisedRecovery};
use crate::system::SystemCore;

/// Lifecycle phase of one actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Registered, `on_start` not yet run.
    Created,
    /// Accepting and dispatching messages.
    Running,
    /// A hook failed; messages queue without running until a recovery
    /// directive for this failure arrives.
    Suspended(FailureId),
    /// Dismissal in progress; `on_stop` is the final dispatch task.
    Stopping,
    /// Terminal. Every further `tell` bounces.
    Stopped,
}

/// One accepted, not-yet-delivered message.
struct Queued {
    message: Message,
    sender: Option<ActorRef>,
    options: Options,
    sent_at: Instant,
}

struct CellState {
    phase: Phase,
    queue: VecDeque<Queued>,
    /// Accepted messages not yet fully processed; bounded by the quota.
    in_flight: usize,
    /// Behavior swapped in by `Agent::set_behavior`; takes effect at the
    /// start of the next dispatch cycle.
    replacement: Option<Box<dyn Behavior>>,
}

/// Behavior plus lifecycle bookkeeping. Guarded by an async mutex that is
/// only ever contended between a dispatch cycle and a recovery task — the
/// bounded executor serializes those anyway.
struct BehaviorState {
    current: Box<dyn Behavior>,
    factory: BehaviorFactory,
    started: bool,
}

enum Verdict {
    Accepted,
    Rejected(BounceReason),
}

/// The server half of one actor: owns its behavior, queue, quota, and
/// dedicated single-concurrency executor.
pub(crate) struct ActorCell {
    name: String,
    quota: usize,
    logger: ActorLogger,
    executor: BoundedExecutor,
    supervisor: Option<ActorRef>,
    behavior: tokio::sync::Mutex<BehaviorState>,
    state: Mutex<CellState>,
    /// Wakes the in-flight dispatch when a dismissal may interrupt it.
    interrupt: Notify,
    failure_seq: AtomicU64,
    system: Weak<SystemCore>,
}

impl ActorCell {
    pub(crate) fn new(
        name: String,
        quota: usize,
        mut factory: BehaviorFactory,
        executor: BoundedExecutor,
        supervisor: Option<ActorRef>,
        system: Weak<SystemCore>,
    ) -> Arc<Self> {
        let current = factory();
        Arc::new(Self {
            logger: ActorLogger::new(&name),
            name,
            quota,
            executor,
            supervisor,
            behavior: tokio::sync::Mutex::new(BehaviorState {
                current,
                factory,
                started: false,
            }),
            state: Mutex::new(CellState {
                phase: Phase::Created,
                queue: VecDeque::new(),
                in_flight: 0,
                replacement: None,
            }),
            interrupt: Notify::new(),
            failure_seq: AtomicU64::new(1),
            system,
        })
    }

    pub(crate) fn logger(&self) -> &ActorLogger {
        &self.logger
    }

    pub(crate) fn executor_capability(&self) -> Arc<dyn TaskExecutor> {
        Arc::new(self.executor.clone())
    }

    pub(crate) fn set_replacement(&self, behavior: Box<dyn Behavior>) {
        self.state.lock().replacement = Some(behavior);
    }

    pub(crate) fn is_terminal(&self) -> bool {
        matches!(
            self.state.lock().phase,
            Phase::Stopping | Phase::Stopped
        )
    }

    /// The sole entry point. Never blocks; acceptance and rejection are
    /// signaled asynchronously per the options' flags.
    fn tell(self: &Arc<Self>, message: Message, options: Options, sender: Option<ActorRef>) {
        let verdict = {
            let mut state = self.state.lock();
            match state.phase {
                Phase::Stopping | Phase::Stopped => Verdict::Rejected(BounceReason::Terminal),
                _ if state.in_flight >= self.quota => {
                    Verdict::Rejected(BounceReason::QuotaExceeded { quota: self.quota })
                }
                _ => {
                    if state.phase == Phase::Created {
                        state.phase = Phase::Running;
                    }
                    state.in_flight += 1;
                    state.queue.push_back(Queued {
                        message: message.clone(),
                        sender: sender.clone(),
                        options: options.clone(),
                        sent_at: Instant::now(),
                    });
                    Verdict::Accepted
                }
            }
        };
        match verdict {
            Verdict::Rejected(reason) => {
                if self.logger.debug_enabled() {
                    self.logger
                        .debug(&format!("rejecting message: {reason:?}"), None);
                }
                if options.wants_bounce {
                    self.reply(
                        &sender,
                        msg(Bounce {
                            message,
                            options: options.clone(),
                            reason,
                        }),
                    );
                }
            }
            Verdict::Accepted => {
                if options.wants_receipt {
                    self.reply(
                        &sender,
                        msg(Receipt {
                            message: message.clone(),
                            options: options.clone(),
                        }),
                    );
                }
                self.submit_dispatch();
            }
        }
    }

    fn submit_dispatch(self: &Arc<Self>) {
        let cell = self.clone();
        self.executor
            .execute(Box::pin(async move { cell.dispatch_cycle().await }));
    }

    /// One dispatch cycle: start the actor if needed, apply any pending
    /// behavior replacement, deliver at most one queued message.
    async fn dispatch_cycle(self: Arc<Self>) {
        let mut behavior = self.behavior.lock().await;

        if !behavior.started && !self.run_on_start(&mut behavior).await {
            return;
        }

        if let Some(replacement) = self.state.lock().replacement.take() {
            behavior.current = replacement;
        }

        let entry = {
            let mut state = self.state.lock();
            if state.phase == Phase::Running {
                state.queue.pop_front()
            } else {
                // Suspended or stopping: leave messages queued. Recovery
                // resubmits dispatch cycles for them.
                None
            }
        };
        let Some(entry) = entry else { return };

        let envelope = Envelope {
            sender: entry.sender.clone(),
            sent_at: entry.sent_at,
            received_at: Instant::now(),
            options: entry.options.clone(),
        };
        let mut agent = Agent::new(self.clone());

        let outcome = tokio::select! {
            biased;
            _ = self.interrupt.notified() => None,
            result = behavior
                .current
                .on_message(entry.message.clone(), &envelope, &mut agent) => Some(result),
        };

        {
            let mut state = self.state.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
        }

        match outcome {
            // Interrupted by dismissal: consumed without acknowledgement.
            None => {}
            Some(Ok(())) => {
                if entry.options.wants_delivery {
                    self.reply(
                        &entry.sender,
                        msg(Delivery {
                            message: entry.message.clone(),
                            options: entry.options.clone(),
                        }),
                    );
                }
                if let Some(effect) = agent.take_effect() {
                    self.apply_effect(&mut behavior, effect).await;
                }
            }
            Some(Err(cause)) => {
                self.enter_failed(&mut behavior, Some(&entry), cause.into())
                    .await;
            }
        }
    }

    /// Runs `on_start`, returning whether the actor is fit to dispatch.
    async fn run_on_start(self: &Arc<Self>, behavior: &mut BehaviorState) -> bool {
        let mut agent = Agent::new(self.clone());
        match behavior.current.on_start(&mut agent).await {
            Ok(()) => {
                behavior.started = true;
                self.logger.debug("started", None);
                if let Some(effect) = agent.take_effect() {
                    self.apply_effect(behavior, effect).await;
                }
                true
            }
            Err(cause) => {
                // The triggering message stays queued; it is delivered (or
                // bounced) once the supervisor decides.
                self.enter_failed(behavior, None, cause.into()).await;
                false
            }
        }
    }

    async fn apply_effect(self: &Arc<Self>, behavior: &mut BehaviorState, effect: AgentEffect) {
        match effect {
            AgentEffect::Restart => self.restart_in_place(behavior).await,
            AgentEffect::Dismiss => self.dismiss(false),
        }
    }

    /// `on_stop` immediately followed by `on_start`, same behavior instance,
    /// still-live actor. Effects requested by the replayed `on_start` are
    /// honored just like on a first start; a repeated restart request loops
    /// here rather than recursing.
    async fn restart_in_place(self: &Arc<Self>, behavior: &mut BehaviorState) {
        loop {
            let mut agent = Agent::new(self.clone());
            if let Err(cause) = behavior.current.on_stop(&mut agent).await {
                self.logger
                    .warn("on_stop failed during restart", Some(cause.as_ref()));
            }
            behavior.started = false;
            let mut agent = Agent::new(self.clone());
            match behavior.current.on_start(&mut agent).await {
                Ok(()) => {
                    behavior.started = true;
                    match agent.take_effect() {
                        Some(AgentEffect::Restart) => continue,
                        Some(AgentEffect::Dismiss) => self.dismiss(false),
                        None => {}
                    }
                }
                Err(cause) => self.enter_failed(behavior, None, cause.into()).await,
            }
            return;
        }
    }

    /// Transition to `Suspended` and hand the failure to the supervisor, or
    /// stop outright when there is none.
    async fn enter_failed(
        self: &Arc<Self>,
        behavior: &mut BehaviorState,
        entry: Option<&Queued>,
        cause: Arc<dyn Error + Send + Sync>,
    ) {
        let failure = FailureId(self.failure_seq.fetch_add(1, Ordering::Relaxed));
        self.state.lock().phase = Phase::Suspended(failure);
        self.logger.warn(
            &format!("behavior failed ({failure}), suspending"),
            Some(cause.as_ref()),
        );
        if let Some(entry) = entry {
            if entry.options.wants_failure {
                self.reply(
                    &entry.sender,
                    msg(Failure {
                        message: entry.message.clone(),
                        options: entry.options.clone(),
                        cause: cause.clone(),
                    }),
                );
            }
        }
        match &self.supervisor {
            Some(supervisor) => {
                supervisor.tell(
                    msg(SupervisedFailure {
                        actor: ActorRef::from_cell(self.clone()),
                        failure,
                        cause,
                    }),
                    Options::new(),
                    Some(ActorRef::from_cell(self.clone())),
                );
            }
            None => {
                // No supervisor: the default policy is stop.
                self.stop_now(behavior, BounceReason::Terminal).await;
            }
        }
    }

    /// Validates and schedules a recovery directive. Stale failure ids are
    /// ignored; only one failure is outstanding at a time.
    pub(crate) fn recover(self: &Arc<Self>, failure: FailureId, directive: Directive) {
        if !self.is_outstanding(failure) {
            self.logger
                .debug(&format!("ignoring stale recovery for {failure}"), None);
            return;
        }
        let cell = self.clone();
        self.executor.execute(Box::pin(async move {
            let mut behavior = cell.behavior.lock().await;
            // Re-check: the phase may have moved while this task waited its
            // turn behind a dispatch cycle.
            if !cell.is_outstanding(failure) {
                return;
            }
            cell.apply_directive(&mut behavior, directive).await;
        }));
    }

    fn is_outstanding(&self, failure: FailureId) -> bool {
        matches!(self.state.lock().phase, Phase::Suspended(f) if f == failure)
    }

    async fn apply_directive(self: &Arc<Self>, behavior: &mut BehaviorState, directive: Directive) {
        self.logger
            .debug(&format!("applying recovery directive {directive:?}"), None);
        match directive {
            Directive::Resume => {
                self.state.lock().phase = Phase::Running;
                self.resubmit_queued();
            }
            Directive::Restart => {
                if behavior.started {
                    let mut agent = Agent::new(self.clone());
                    if let Err(cause) = behavior.current.on_stop(&mut agent).await {
                        self.logger
                            .warn("on_stop failed during restart", Some(cause.as_ref()));
                    }
                }
                behavior.current = (behavior.factory)();
                behavior.started = false;
                self.state.lock().phase = Phase::Running;
                if self.run_on_start(behavior).await {
                    self.resubmit_queued();
                }
            }
            Directive::Stop => {
                self.stop_now(behavior, BounceReason::Terminal).await;
            }
        }
    }

    /// One dispatch cycle per message left queued across the suspension.
    fn resubmit_queued(self: &Arc<Self>) {
        let pending = self.state.lock().queue.len();
        for _ in 0..pending {
            self.submit_dispatch();
        }
    }

    /// Final transition: best-effort `on_stop`, bounce whatever is still
    /// queued, deregister.
    async fn stop_now(self: &Arc<Self>, behavior: &mut BehaviorState, reason: BounceReason) {
        if self.state.lock().phase == Phase::Stopped {
            return;
        }
        if behavior.started {
            let mut agent = Agent::new(self.clone());
            if let Err(cause) = behavior.current.on_stop(&mut agent).await {
                self.logger.warn("on_stop failed", Some(cause.as_ref()));
            }
            behavior.started = false;
        }
        let drained = {
            let mut state = self.state.lock();
            state.phase = Phase::Stopped;
            state.in_flight = 0;
            state.queue.drain(..).collect::<Vec<_>>()
        };
        for entry in drained {
            if entry.options.wants_bounce {
                self.reply(
                    &entry.sender,
                    msg(Bounce {
                        message: entry.message,
                        options: entry.options.clone(),
                        reason,
                    }),
                );
            }
        }
        if let Some(system) = self.system.upgrade() {
            system.deregister(&self.name);
        }
        self.logger.debug("stopped", None);
    }

    /// Idempotent dismissal: stop intake, discard (and, where requested,
    /// bounce) queued messages, optionally interrupt the in-flight dispatch,
    /// and schedule `on_stop` as the final dispatch task.
    pub(crate) fn dismiss(self: &Arc<Self>, may_interrupt_if_running: bool) {
        let drained = {
            let mut state = self.state.lock();
            if matches!(state.phase, Phase::Stopping | Phase::Stopped) {
                return;
            }
            state.phase = Phase::Stopping;
            let drained: Vec<Queued> = state.queue.drain(..).collect();
            state.in_flight = state.in_flight.saturating_sub(drained.len());
            drained
        };
        self.logger.debug("dismissing", None);
        for entry in drained {
            if entry.options.wants_bounce {
                self.reply(
                    &entry.sender,
                    msg(Bounce {
                        message: entry.message,
                        options: entry.options.clone(),
                        reason: BounceReason::Dismissed,
                    }),
                );
            }
        }
        if may_interrupt_if_running {
            self.interrupt.notify_one();
        }
        let cell = self.clone();
        self.executor.execute(Box::pin(async move {
            let mut behavior = cell.behavior.lock().await;
            cell.stop_now(&mut behavior, BounceReason::Dismissed).await;
        }));
    }

    fn reply(self: &Arc<Self>, recipient: &Option<ActorRef>, message: Message) {
        if let Some(recipient) = recipient {
            recipient.tell(
                message,
                Options::new(),
                Some(ActorRef::from_cell(self.clone())),
            );
        }
    }
}

/// A cheap, cloneable reference to an actor. The client half of the cell:
/// everything outside the actor interacts through this.
#[derive(Clone)]
pub struct ActorRef {
    cell: Arc<ActorCell>,
}

impl ActorRef {
    pub(crate) fn from_cell(cell: Arc<ActorCell>) -> Self {
        Self { cell }
    }

    /// Fire-and-forget send. Never blocks; acceptance, rejection, and
    /// processing results come back to `sender` as signal messages when the
    /// options request them.
    ///
    /// [`SupervisedRecovery`] messages are intercepted ahead of the mailbox
    /// and applied as recovery directives.
    pub fn tell(&self, message: Message, options: Options, sender: Option<ActorRef>) {
        if let Some(recovery) = message.downcast_ref::<SupervisedRecovery>() {
            self.cell.recover(recovery.failure, recovery.directive);
            return;
        }
        self.cell.tell(message, options, sender);
    }

    /// Dismisses the actor. The second and later calls are no-ops.
    pub fn dismiss(&self, may_interrupt_if_running: bool) {
        self.cell.dismiss(may_interrupt_if_running);
    }

    /// Applies a recovery directive for an outstanding failure. Stale
    /// failure ids are ignored.
    pub fn recover(&self, failure: FailureId, directive: Directive) {
        self.cell.recover(failure, directive);
    }

    pub fn name(&self) -> &str {
        &self.cell.name
    }

    pub fn is_terminated(&self) -> bool {
        self.cell.is_terminal()
    }
}

impl std::fmt::Debug for ActorRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ActorRef({})", self.cell.name)
    }
}

impl PartialEq for ActorRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

impl Eq for ActorRef {}
