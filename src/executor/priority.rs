//! # Priority Executor
//!
//! Wraps an executor with a shared priority queue so higher-priority (or, on
//! ties, earlier-submitted) tasks run first. Several [`PriorityExecutor`]
//! views can be built over one [`PriorityArbiter`]; they then share a single
//! ordering domain, which is how control and supervision traffic preempts
//! ordinary mailbox traffic on the same pool.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use super::{Task, TaskExecutor};

/// The explicit, shared ordering domain for a set of priority views.
///
/// Ties between equal priorities break FIFO via a monotonically increasing
/// submission index, so the ordering is wrap-safe no matter how long the
/// arbiter lives.
pub struct PriorityArbiter {
    heap: Mutex<BinaryHeap<Entry>>,
    seq: AtomicU64,
}

struct Entry {
    priority: i32,
    seq: u64,
    task: Task,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // Max-heap: higher priority wins, then the smaller (earlier)
        // submission index.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PriorityArbiter {
    pub fn new() -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            seq: AtomicU64::new(0),
        }
    }

    fn push(&self, task: Task, priority: i32) {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        self.heap.lock().push(Entry {
            priority,
            seq,
            task,
        });
    }

    fn pop(&self) -> Option<Task> {
        self.heap.lock().pop().map(|entry| entry.task)
    }

    fn drain(&self) -> Vec<Task> {
        let mut heap = self.heap.lock();
        let mut tasks = Vec::with_capacity(heap.len());
        while let Some(entry) = heap.pop() {
            tasks.push(entry.task);
        }
        tasks
    }

    pub fn len(&self) -> usize {
        self.heap.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.lock().is_empty()
    }
}

impl Default for PriorityArbiter {
    fn default() -> Self {
        Self::new()
    }
}

/// A fixed-priority view over an inner executor and a shared arbiter.
///
/// Every submission pushes the task into the arbiter and hands the inner
/// executor exactly one dequeue-and-run task; each dequeue task pops the
/// highest-priority pending entry, or is a no-op when the heap is empty.
#[derive(Clone)]
pub struct PriorityExecutor {
    inner: Arc<dyn TaskExecutor>,
    arbiter: Arc<PriorityArbiter>,
    priority: i32,
}

impl PriorityExecutor {
    pub fn new(inner: Arc<dyn TaskExecutor>, arbiter: Arc<PriorityArbiter>, priority: i32) -> Self {
        Self {
            inner,
            arbiter,
            priority,
        }
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }
}

impl TaskExecutor for PriorityExecutor {
    fn execute(&self, task: Task) {
        // Checked before the push: a task that reaches the arbiter after
        // shutdown would be stranded in the heap, or run by a dequeue task
        // of another still-live view.
        if self.inner.is_shutdown() {
            warn!("task submitted to priority executor after shutdown, dropping");
            return;
        }
        self.arbiter.push(task, self.priority);
        let arbiter = self.arbiter.clone();
        self.inner.execute(Box::pin(async move {
            if let Some(task) = arbiter.pop() {
                task.await;
            }
        }));
    }

    fn shutdown(&self) {
        self.inner.shutdown();
    }

    fn shutdown_now(&self) -> Vec<Task> {
        // Drains the whole shared ordering domain, not just this view's
        // submissions; the arbiter does not track which view queued what.
        let mut drained = self.arbiter.drain();
        drained.extend(self.inner.shutdown_now());
        drained
    }

    fn is_shutdown(&self) -> bool {
        self.inner.is_shutdown()
    }
}
