//! # Acknowledgement Signals
//!
//! The reply messages the dispatcher sends back to a message's original
//! sender when its [`Options`](crate::envelope::Options) ask for them.
//! Rejection is always signaled this way — never as an error at the `tell`
//! call site.

use std::error::Error;
use std::sync::Arc;

use crate::envelope::{Message, Options};

/// Positive acknowledgement: the message was accepted into the mailbox.
#[derive(Clone)]
pub struct Receipt {
    pub message: Message,
    pub options: Options,
}

/// Positive acknowledgement: `on_message` completed without error.
#[derive(Clone)]
pub struct Delivery {
    pub message: Message,
    pub options: Options,
}

/// Why a message was rejected before reaching the behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BounceReason {
    /// The recipient's inbox quota was already full.
    QuotaExceeded { quota: usize },
    /// The recipient had already stopped.
    Terminal,
    /// The recipient was dismissed while the message was still queued.
    Dismissed,
}

/// Negative acknowledgement: the message never reached the behavior. Carries
/// the original message so the sender can retry or reroute it.
#[derive(Clone)]
pub struct Bounce {
    pub message: Message,
    pub options: Options,
    pub reason: BounceReason,
}

/// Negative acknowledgement: the message was accepted but its handler failed.
#[derive(Clone)]
pub struct Failure {
    pub message: Message,
    pub options: Options,
    pub cause: Arc<dyn Error + Send + Sync>,
}

impl std::fmt::Debug for Receipt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Receipt")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for Bounce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bounce")
            .field("reason", &self.reason)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Failure")
            .field("cause", &self.cause.to_string())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
