//! # Task Executors
//!
//! This module defines the [`TaskExecutor`] capability and the decorators that
//! turn a plain spawner into a bounded-concurrency, priority-aware,
//! schedulable, timeout-aware dispatch primitive. Every decorator implements
//! `TaskExecutor` itself, so they compose transparently: an actor mailbox is
//! nothing more than a [`BoundedExecutor`] with concurrency 1 wrapped around
//! whatever the system hands it.
//!
//! # Concurrency Model
//! Tasks are opaque futures with no identity beyond submission order (and,
//! for the priority decorator, a priority). The executors never block a
//! worker waiting on one another; all coordination goes through short-lived
//! mutexes and `oneshot` completion signals.

mod bounded;
mod priority;
mod scheduled;
mod timeout;

pub use bounded::BoundedExecutor;
pub use priority::{PriorityArbiter, PriorityExecutor};
pub use scheduled::{ScheduledExecutor, ScheduledHandle};
pub use timeout::TimeoutExecutor;

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::runtime::Handle;
use tracing::warn;

/// An opaque unit of work. Tasks carry no result; anything a task produces
/// travels over a channel it captured at construction time.
pub type Task = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Boxes a future into a [`Task`].
pub fn task(fut: impl Future<Output = ()> + Send + 'static) -> Task {
    Box::pin(fut)
}

/// The executor capability consumed by the rest of the runtime.
///
/// All four decorators ([`BoundedExecutor`], [`PriorityExecutor`],
/// [`ScheduledExecutor`], [`TimeoutExecutor`]) implement this trait over an
/// inner `Arc<dyn TaskExecutor>`, so policy is stacked by wrapping.
pub trait TaskExecutor: Send + Sync + 'static {
    /// Submits a task for eventual execution. Never blocks the caller.
    ///
    /// Work submitted after [`shutdown`](Self::shutdown) is dropped with a
    /// warning; submission failure is never surfaced at the call site.
    fn execute(&self, task: Task);

    /// Stops accepting new work. Already-queued work still drains.
    fn shutdown(&self);

    /// Stops accepting new work and returns the queued tasks that were never
    /// started, forwarding the call to the wrapped executor (if any).
    fn shutdown_now(&self) -> Vec<Task>;

    /// Whether this executor has stopped accepting work.
    fn is_shutdown(&self) -> bool;
}

/// The base executor: submits tasks straight onto a Tokio runtime.
///
/// This is the shared multi-threaded pool every decorator ultimately drains
/// into. Spawned tasks cannot be reclaimed, so `shutdown_now` only stops
/// intake and returns nothing.
pub struct Spawner {
    handle: Handle,
    shutdown: AtomicBool,
}

impl Spawner {
    /// Creates a spawner over the current Tokio runtime.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime context.
    pub fn new() -> Self {
        Self::from_handle(Handle::current())
    }

    pub fn from_handle(handle: Handle) -> Self {
        Self {
            handle,
            shutdown: AtomicBool::new(false),
        }
    }
}

impl Default for Spawner {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskExecutor for Spawner {
    fn execute(&self, task: Task) {
        if self.is_shutdown() {
            warn!("task submitted after shutdown, dropping");
            return;
        }
        self.handle.spawn(task);
    }

    fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    fn shutdown_now(&self) -> Vec<Task> {
        self.shutdown();
        Vec::new()
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}
