//! # Actor System
//!
//! The registry and shared execution substrate. One [`ActorSystem`] owns the
//! spawner over the Tokio pool plus a single priority ordering domain with
//! two views: ordinary mailbox traffic and elevated control/supervision
//! traffic. Every actor gets its own bounded (concurrency 1) executor over
//! one of those views.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::behavior::{Behavior, BehaviorFactory};
use crate::config::SystemConfig;
use crate::error::SpawnError;
use crate::executor::{
    BoundedExecutor, PriorityArbiter, PriorityExecutor, ScheduledExecutor, Spawner, TaskExecutor,
};
use crate::mailbox::{ActorCell, ActorRef};

pub(crate) struct SystemCore {
    config: SystemConfig,
    spawner: Arc<Spawner>,
    workers: PriorityExecutor,
    control: PriorityExecutor,
    registry: Mutex<HashMap<String, ActorRef>>,
    next_anonymous: AtomicU64,
    shutdown: AtomicBool,
}

impl SystemCore {
    pub(crate) fn deregister(&self, name: &str) {
        if self.registry.lock().remove(name).is_some() {
            debug!(system = %self.config.name, actor = %name, "deregistered");
        }
    }
}

/// An actor registry over a shared worker pool.
///
/// Cloning is cheap; clones address the same registry and pool.
#[derive(Clone)]
pub struct ActorSystem {
    core: Arc<SystemCore>,
}

impl ActorSystem {
    /// Creates a system over the current Tokio runtime.
    pub fn new(config: SystemConfig) -> Self {
        let spawner = Arc::new(Spawner::new());
        let arbiter = Arc::new(PriorityArbiter::new());
        let workers = PriorityExecutor::new(
            spawner.clone(),
            arbiter.clone(),
            config.worker_priority,
        );
        let control = PriorityExecutor::new(spawner.clone(), arbiter, config.control_priority);
        info!(system = %config.name, "actor system created");
        Self {
            core: Arc::new(SystemCore {
                config,
                spawner,
                workers,
                control,
                registry: Mutex::new(HashMap::new()),
                next_anonymous: AtomicU64::new(1),
                shutdown: AtomicBool::new(false),
            }),
        }
    }

    /// Starts building an actor from a behavior factory. The factory is kept
    /// for the actor's lifetime so supervision restarts can mint a fresh
    /// behavior instance.
    pub fn agent<F, B>(&self, mut factory: F) -> AgentBuilder
    where
        F: FnMut() -> B + Send + 'static,
        B: Behavior,
    {
        AgentBuilder {
            system: self.clone(),
            factory: Box::new(move || Box::new(factory())),
            name: None,
            quota: None,
            supervisor: None,
            control_priority: false,
        }
    }

    pub fn lookup(&self, name: &str) -> Option<ActorRef> {
        self.core.registry.lock().get(name).cloned()
    }

    /// A scheduling decorator over the shared spawner, for delayed and
    /// periodic work outside any one mailbox.
    pub fn scheduler(&self) -> ScheduledExecutor {
        ScheduledExecutor::new(self.core.spawner.clone())
    }

    /// The ordinary-priority view of the shared pool.
    pub fn executor(&self) -> Arc<dyn TaskExecutor> {
        Arc::new(self.core.workers.clone())
    }

    /// Dismisses every registered actor and refuses further spawns.
    pub fn shutdown(&self) {
        self.core.shutdown.store(true, Ordering::SeqCst);
        let actors: Vec<ActorRef> = self.core.registry.lock().values().cloned().collect();
        info!(system = %self.core.config.name, count = actors.len(), "shutting down");
        for actor in actors {
            actor.dismiss(false);
        }
    }

    fn register(&self, builder: AgentBuilder) -> Result<ActorRef, SpawnError> {
        if self.core.shutdown.load(Ordering::SeqCst) {
            return Err(SpawnError::SystemShutdown);
        }
        let name = builder.name.unwrap_or_else(|| {
            let n = self.core.next_anonymous.fetch_add(1, Ordering::Relaxed);
            format!("{}-agent-{}", self.core.config.name, n)
        });
        let quota = builder
            .quota
            .or(self.core.config.default_quota)
            .unwrap_or(usize::MAX);
        let view: Arc<dyn TaskExecutor> = if builder.control_priority {
            Arc::new(self.core.control.clone())
        } else {
            Arc::new(self.core.workers.clone())
        };
        let executor = BoundedExecutor::new(view, 1);

        let mut registry = self.core.registry.lock();
        if registry.contains_key(&name) {
            return Err(SpawnError::DuplicateName(name));
        }
        let cell = ActorCell::new(
            name.clone(),
            quota,
            builder.factory,
            executor,
            builder.supervisor,
            Arc::downgrade(&self.core),
        );
        let actor = ActorRef::from_cell(cell);
        registry.insert(name.clone(), actor.clone());
        drop(registry);
        debug!(system = %self.core.config.name, actor = %name, quota, "registered");
        Ok(actor)
    }
}

/// Builder for one actor registration.
pub struct AgentBuilder {
    system: ActorSystem,
    factory: BehaviorFactory,
    name: Option<String>,
    quota: Option<usize>,
    supervisor: Option<ActorRef>,
    control_priority: bool,
}

impl AgentBuilder {
    /// Registry name; must be unique. Anonymous actors get a generated one.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Maximum queued/in-flight messages before new arrivals bounce.
    pub fn quota(mut self, quota: usize) -> Self {
        self.quota = Some(quota);
        self
    }

    /// The actor that receives this actor's failure notifications.
    pub fn supervisor(mut self, supervisor: ActorRef) -> Self {
        self.supervisor = Some(supervisor);
        self
    }

    /// Runs this actor's dispatches at the system's control priority so it
    /// preempts ordinary mailbox traffic; meant for supervisors.
    pub fn control_priority(mut self) -> Self {
        self.control_priority = true;
        self
    }

    /// Registers the actor. `on_start` runs on the first `tell`, not here.
    pub fn spawn(self) -> Result<ActorRef, SpawnError> {
        let system = self.system.clone();
        system.register(self)
    }
}
