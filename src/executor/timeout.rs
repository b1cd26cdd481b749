//! # Timeout Executor
//!
//! Wraps submissions with a watchdog so a task that exceeds its deadline is
//! cancelled (or, in the non-interrupting mode, merely reported). Each
//! decorator owns its watchdog state outright; there is no process-global
//! timer registry to reference-count or tear down.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::warn;

use super::{Task, TaskExecutor};

/// A deadline-enforcing decorator over an inner executor.
///
/// Timeout surfaces as a cancelled task, not as a distinct error kind: a
/// caller that needs to observe completion does so through whatever channel
/// the task itself carries, and a cancelled task simply never reports.
#[derive(Clone)]
pub struct TimeoutExecutor {
    inner: Arc<dyn TaskExecutor>,
    timeout: Duration,
    interrupt_on_timeout: bool,
}

impl TimeoutExecutor {
    /// # Panics
    /// A zero `timeout` is a configuration error and panics immediately.
    pub fn new(inner: Arc<dyn TaskExecutor>, timeout: Duration, interrupt_on_timeout: bool) -> Self {
        assert!(timeout > Duration::ZERO, "timeout must be positive");
        Self {
            inner,
            timeout,
            interrupt_on_timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl TaskExecutor for TimeoutExecutor {
    fn execute(&self, task: Task) {
        let timeout = self.timeout;
        let interrupt = self.interrupt_on_timeout;
        self.inner.execute(Box::pin(async move {
            if interrupt {
                if time::timeout(timeout, task).await.is_err() {
                    warn!(?timeout, "task exceeded deadline, cancelled");
                }
            } else {
                let started = Instant::now();
                task.await;
                let elapsed = started.elapsed();
                if elapsed > timeout {
                    warn!(?timeout, ?elapsed, "task exceeded deadline");
                }
            }
        }));
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
