//! # Bounded-Concurrency Executor
//!
//! Wraps any [`TaskExecutor`] so that at most `max_concurrency` submitted
//! tasks run at the same time; the rest wait in a FIFO queue. With
//! `max_concurrency == 1` this degenerates to strict serial FIFO execution,
//! which is exactly the mechanism that gives each actor mailbox its
//! single-threaded semantics while still sharing one thread pool.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::warn;

use super::{Task, TaskExecutor};

/// A concurrency-limiting decorator over an inner executor.
///
/// Invariant: exactly `min(max_concurrency, queue length)` drain cycles are
/// in flight at any instant. A drain cycle pops one queued task, runs it on
/// the inner executor, and — whether the task completed or panicked — moves
/// on to the next one, or retires itself when the queue is empty.
///
/// Cloning is cheap; clones share the same queue and limit.
#[derive(Clone)]
pub struct BoundedExecutor {
    core: Arc<Core>,
}

struct Core {
    inner: Arc<dyn TaskExecutor>,
    max_concurrency: usize,
    state: Mutex<State>,
}

struct State {
    queue: VecDeque<Task>,
    /// Number of drain cycles currently in flight.
    active: usize,
    shutdown: bool,
}

impl BoundedExecutor {
    /// Wraps `inner` with a concurrency limit.
    ///
    /// # Panics
    /// `max_concurrency` of zero is a configuration error and panics
    /// immediately rather than deadlocking at execution time.
    pub fn new(inner: Arc<dyn TaskExecutor>, max_concurrency: usize) -> Self {
        assert!(max_concurrency > 0, "max_concurrency must be at least 1");
        Self {
            core: Arc::new(Core {
                inner,
                max_concurrency,
                state: Mutex::new(State {
                    queue: VecDeque::new(),
                    active: 0,
                    shutdown: false,
                }),
            }),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.core.max_concurrency
    }

    /// Submits one drain cycle to the inner executor.
    ///
    /// Each payload runs as its own inner submission and reports completion
    /// over a oneshot; a dropped sender (payload panicked, or the inner
    /// executor refused the work) is treated the same as completion, so a
    /// failing task never stalls the queue behind it.
    fn spawn_drain(&self) {
        let core = self.core.clone();
        self.core.inner.execute(Box::pin(async move {
            loop {
                let task = {
                    let mut state = core.state.lock();
                    match state.queue.pop_front() {
                        Some(task) => task,
                        None => {
                            // Retire under the same lock that guards intake,
                            // so a concurrent `execute` either sees us still
                            // active or starts a fresh drain. No task can be
                            // left stranded.
                            state.active -= 1;
                            return;
                        }
                    }
                };
                let (done_tx, done_rx) = oneshot::channel::<()>();
                core.inner.execute(Box::pin(async move {
                    task.await;
                    let _ = done_tx.send(());
                }));
                let _ = done_rx.await;
            }
        }));
    }
}

impl TaskExecutor for BoundedExecutor {
    fn execute(&self, task: Task) {
        let start_drain = {
            let mut state = self.core.state.lock();
            if state.shutdown {
                drop(state);
                warn!("task submitted to bounded executor after shutdown, dropping");
                return;
            }
            state.queue.push_back(task);
            if state.active < self.core.max_concurrency {
                state.active += 1;
                true
            } else {
                false
            }
        };
        if start_drain {
            self.spawn_drain();
        }
    }

    fn shutdown(&self) {
        // Intake stops; queued work keeps draining on the inner executor.
        self.core.state.lock().shutdown = true;
    }

    fn shutdown_now(&self) -> Vec<Task> {
        let mut drained: Vec<Task> = {
            let mut state = self.core.state.lock();
            state.shutdown = true;
            state.queue.drain(..).collect()
        };
        drained.extend(self.core.inner.shutdown_now());
        drained
    }

    fn is_shutdown(&self) -> bool {
        self.core.state.lock().shutdown
    }
}
