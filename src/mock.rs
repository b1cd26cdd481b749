//! # Test Probes
//!
//! Testing support: a [`Probe`] is a behavior that records everything that
//! happens to its actor — lifecycle transitions and deliveries — into an
//! unbounded channel, so tests can spawn it as a target actor or as a
//! sender that collects signal replies, then assert on the exact sequence.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::behavior::{Agent, Behavior};
use crate::envelope::{Envelope, Message};
use crate::error::BehaviorError;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// One observation recorded by a [`Probe`].
pub enum ProbeEvent {
    /// `on_start` ran.
    Started,
    /// `on_message` ran with this delivery.
    Message { message: Message, envelope: Envelope },
    /// `on_stop` ran.
    Stopped,
}

impl std::fmt::Debug for ProbeEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeEvent::Started => write!(f, "Started"),
            ProbeEvent::Message { envelope, .. } => {
                write!(f, "Message {{ envelope: {envelope:?} }}")
            }
            ProbeEvent::Stopped => write!(f, "Stopped"),
        }
    }
}

/// A recording behavior. Cloneable so it can serve as a behavior factory:
/// `system.agent(move || probe.clone())`.
#[derive(Clone)]
pub struct Probe {
    tx: mpsc::UnboundedSender<ProbeEvent>,
}

impl Probe {
    pub fn new() -> (Probe, ProbeHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Probe { tx }, ProbeHandle { rx })
    }
}

#[async_trait]
impl Behavior for Probe {
    async fn on_start(&mut self, _agent: &mut Agent) -> Result<(), BehaviorError> {
        let _ = self.tx.send(ProbeEvent::Started);
        Ok(())
    }

    async fn on_message(
        &mut self,
        message: Message,
        envelope: &Envelope,
        _agent: &mut Agent,
    ) -> Result<(), BehaviorError> {
        let _ = self.tx.send(ProbeEvent::Message {
            message,
            envelope: envelope.clone(),
        });
        Ok(())
    }

    async fn on_stop(&mut self, _agent: &mut Agent) -> Result<(), BehaviorError> {
        let _ = self.tx.send(ProbeEvent::Stopped);
        Ok(())
    }
}

/// The assertion side of a [`Probe`].
///
/// All `expect_*` helpers panic on timeout or mismatch; they are meant for
/// tests only.
pub struct ProbeHandle {
    rx: mpsc::UnboundedReceiver<ProbeEvent>,
}

impl ProbeHandle {
    /// Waits for the next recorded event.
    pub async fn recv(&mut self) -> ProbeEvent {
        timeout(PROBE_TIMEOUT, self.rx.recv())
            .await
            .expect("probe: timed out waiting for an event")
            .expect("probe: recording behavior dropped")
    }

    pub async fn expect_started(&mut self) {
        let event = self.recv().await;
        assert!(
            matches!(event, ProbeEvent::Started),
            "probe: expected Started, got {event:?}"
        );
    }

    pub async fn expect_stopped(&mut self) {
        let event = self.recv().await;
        assert!(
            matches!(event, ProbeEvent::Stopped),
            "probe: expected Stopped, got {event:?}"
        );
    }

    /// Waits for the next event, asserts it is a delivery of a `T`, and
    /// returns the payload with its envelope.
    pub async fn expect_message<T: Any + Send + Sync>(&mut self) -> (Arc<T>, Envelope) {
        match self.recv().await {
            ProbeEvent::Message { message, envelope } => {
                let payload = message.downcast::<T>().unwrap_or_else(|_| {
                    panic!(
                        "probe: delivery was not a {}",
                        std::any::type_name::<T>()
                    )
                });
                (payload, envelope)
            }
            other => panic!("probe: expected a delivery, got {other:?}"),
        }
    }

    /// Asserts that nothing is recorded within `window`.
    pub async fn expect_silence(&mut self, window: Duration) {
        if let Ok(Some(event)) = timeout(window, self.rx.recv()).await {
            panic!("probe: expected silence, got {event:?}");
        }
    }

    pub fn try_recv(&mut self) -> Option<ProbeEvent> {
        self.rx.try_recv().ok()
    }
}
