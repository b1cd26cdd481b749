//! # Envelope & Options
//!
//! The metadata carrier that accompanies every delivered message: who sent
//! it, when it was sent and received (monotonic clock), which conversation it
//! belongs to, and which acknowledgements the sender asked for.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::time::Instant;

use crate::mailbox::ActorRef;

/// A message payload. Messages are shared rather than owned so rejection
/// signals can carry the original message back to its sender.
pub type Message = Arc<dyn Any + Send + Sync>;

/// Boxes a value into a [`Message`].
pub fn msg<T: Any + Send + Sync>(value: T) -> Message {
    Arc::new(value)
}

/// Correlation id tying together the messages of one conversational exchange
/// without a dedicated reply channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadId(u64);

impl ThreadId {
    /// Allocates a fresh, process-unique thread id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "thread-{}", self.0)
    }
}

/// Per-message delivery options: conversation id plus the acknowledgement
/// flags. Immutable; built once by the sender.
///
/// The flags map one-to-one onto the signal structs in [`crate::signal`]:
/// a receipt confirms mailbox acceptance, a delivery confirms successful
/// processing, a bounce reports rejection, and a failure reports a handler
/// error after acceptance.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub thread: Option<ThreadId>,
    pub wants_receipt: bool,
    pub wants_delivery: bool,
    pub wants_bounce: bool,
    pub wants_failure: bool,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn thread(mut self, thread: ThreadId) -> Self {
        self.thread = Some(thread);
        self
    }

    pub fn with_receipt(mut self) -> Self {
        self.wants_receipt = true;
        self
    }

    pub fn with_delivery(mut self) -> Self {
        self.wants_delivery = true;
        self
    }

    pub fn with_bounce(mut self) -> Self {
        self.wants_bounce = true;
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.wants_failure = true;
        self
    }
}

/// Immutable delivery metadata handed to `Behavior::on_message` alongside the
/// message itself.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// The sending actor, when one was supplied; `None` for messages injected
    /// from outside the actor system.
    pub sender: Option<ActorRef>,
    /// When the message was accepted into the mailbox.
    pub sent_at: Instant,
    /// When the dispatcher picked the message up for delivery.
    pub received_at: Instant,
    pub options: Options,
}

impl Envelope {
    /// Queue latency of this delivery.
    pub fn queued_for(&self) -> std::time::Duration {
        self.received_at.duration_since(self.sent_at)
    }
}
