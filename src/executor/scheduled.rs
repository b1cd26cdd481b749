//! # Scheduled Executor
//!
//! Adds delayed and periodic execution on top of any [`TaskExecutor`]. The
//! timer itself is delegated to Tokio's clock; the payload always executes on
//! the wrapped inner executor, so scheduled work still obeys whatever
//! bounded-concurrency or priority policy that executor enforces.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Notify};
use tokio::time::{self, Instant};

use super::{Task, TaskExecutor};

/// A cancellable handle to a scheduled (one-shot or periodic) task.
///
/// Cancelling stops the timer, prevents a not-yet-started payload from
/// running, and interrupts an in-flight payload at its next await point.
#[derive(Clone)]
pub struct ScheduledHandle {
    flag: Arc<CancelFlag>,
}

struct CancelFlag {
    cancelled: AtomicBool,
    notify: Notify,
}

impl ScheduledHandle {
    fn new() -> Self {
        Self {
            flag: Arc::new(CancelFlag {
                cancelled: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }

    pub fn cancel(&self) {
        self.flag.cancelled.store(true, Ordering::SeqCst);
        self.flag.notify.notify_one();
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once the handle has been cancelled.
    async fn wait(&self) {
        while !self.is_cancelled() {
            self.flag.notify.notified().await;
        }
    }

    /// Wraps a payload so cancellation is honored both before it starts and
    /// while it runs.
    fn guard(&self, payload: Task) -> Task {
        let handle = self.clone();
        Box::pin(async move {
            if handle.is_cancelled() {
                return;
            }
            tokio::select! {
                _ = handle.wait() => {}
                _ = payload => {}
            }
        })
    }
}

/// A scheduling decorator. Immediate submissions pass straight through to
/// the inner executor.
#[derive(Clone)]
pub struct ScheduledExecutor {
    inner: Arc<dyn TaskExecutor>,
}

impl ScheduledExecutor {
    pub fn new(inner: Arc<dyn TaskExecutor>) -> Self {
        Self { inner }
    }

    /// Runs `task` once on the inner executor after `delay`.
    pub fn schedule(&self, task: Task, delay: Duration) -> ScheduledHandle {
        let handle = ScheduledHandle::new();
        let guard = handle.clone();
        let inner = self.inner.clone();
        let target = Instant::now() + delay;
        tokio::spawn(async move {
            tokio::select! {
                _ = guard.wait() => return,
                _ = time::sleep_until(target) => {}
            }
            inner.execute(guard.guard(task));
        });
        handle
    }

    /// Runs tasks from `factory` periodically; each fire target is the
    /// previous target plus `period`, so an overdue schedule catches up with
    /// back-to-back fires rather than drifting.
    ///
    /// # Panics
    /// A zero `period` is a configuration error and panics immediately.
    pub fn schedule_at_fixed_rate<F>(
        &self,
        factory: F,
        initial_delay: Duration,
        period: Duration,
    ) -> ScheduledHandle
    where
        F: Fn() -> Task + Send + 'static,
    {
        assert!(period > Duration::ZERO, "period must be positive");
        let handle = ScheduledHandle::new();
        let guard = handle.clone();
        let inner = self.inner.clone();
        tokio::spawn(async move {
            let mut next = Instant::now() + initial_delay;
            loop {
                tokio::select! {
                    _ = guard.wait() => return,
                    _ = time::sleep_until(next) => {}
                }
                inner.execute(guard.guard(factory()));
                next += period;
            }
        });
        handle
    }

    /// Runs tasks from `factory` with a fixed pause between the completion of
    /// one execution and the start of the next.
    ///
    /// # Panics
    /// A zero `period` is a configuration error and panics immediately.
    pub fn schedule_with_fixed_delay<F>(
        &self,
        factory: F,
        initial_delay: Duration,
        period: Duration,
    ) -> ScheduledHandle
    where
        F: Fn() -> Task + Send + 'static,
    {
        assert!(period > Duration::ZERO, "period must be positive");
        let handle = ScheduledHandle::new();
        let guard = handle.clone();
        let inner = self.inner.clone();
        tokio::spawn(async move {
            let mut next = Instant::now() + initial_delay;
            loop {
                tokio::select! {
                    _ = guard.wait() => return,
                    _ = time::sleep_until(next) => {}
                }
                let (done_tx, done_rx) = oneshot::channel::<()>();
                let payload = factory();
                inner.execute(guard.guard(Box::pin(async move {
                    payload.await;
                    let _ = done_tx.send(());
                })));
                // A dropped sender (payload cancelled or refused) still
                // advances the schedule.
                tokio::select! {
                    _ = guard.wait() => return,
                    _ = done_rx => {}
                }
                next = Instant::now() + period;
            }
        });
        handle
    }
}

impl TaskExecutor for ScheduledExecutor {
    fn execute(&self, task: Task) {
        self.inner.execute(task);
    }

    fn shutdown(&self) {
        self.inner.shutdown();
    }

    fn shutdown_now(&self) -> Vec<Task> {
        self.inner.shutdown_now()
    }

    fn is_shutdown(&self) -> bool {
        self.inner.is_shutdown()
    }
}
