//! # Agentry
//!
//! An in-process actor runtime on top of Tokio: composable task executors,
//! serialized mailboxes, and supervised recovery.
//!
//! ## Architecture Overview
//!
//! The crate is layered:
//!
//! - **Executors** ([`executor`]): a [`TaskExecutor`] capability with
//!   composable decorators — [`BoundedExecutor`] caps concurrency over an
//!   inner executor, [`PriorityExecutor`] orders submissions through a shared
//!   [`PriorityArbiter`], [`ScheduledExecutor`] adds delayed and periodic
//!   submission, and [`TimeoutExecutor`] bounds task runtime.
//! - **Dispatch** ([`mailbox`], [`behavior`], [`envelope`], [`signal`]): an
//!   actor is a [`Behavior`] behind an [`ActorRef`]. Every actor owns a
//!   bounded (concurrency 1) executor over the system's shared pool, so its
//!   hooks never overlap, yet no thread is pinned to any actor. Senders can
//!   opt into [`Receipt`], [`Delivery`], [`Bounce`], and [`Failure`] signal
//!   replies per message through [`Options`].
//! - **Supervision and registry** ([`supervision`], [`system`]): a failing
//!   hook suspends the actor and notifies its supervisor, which answers with
//!   a [`Directive`]; the [`ActorSystem`] holds the name registry and the
//!   shared execution substrate.
//!
//! ## Concurrency Model
//!
//! Actors have no thread affinity. Consecutive dispatch cycles of one actor
//! may run on different worker threads, but never concurrently, and messages
//! from one sender to one recipient are delivered in send order.
//!
//! ## Example
//!
//! ```
//! use agentry::{from_fn, msg, ActorSystem, Options, SystemConfig};
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "multi_thread")]
//! # async fn main() {
//! let system = ActorSystem::new(SystemConfig::default());
//! let hits = Arc::new(AtomicU32::new(0));
//!
//! let counter = {
//!     let hits = hits.clone();
//!     system
//!         .agent(move || {
//!             let hits = hits.clone();
//!             from_fn(move |message, _envelope, _agent| {
//!                 if let Some(n) = message.downcast_ref::<u32>() {
//!                     hits.fetch_add(*n, Ordering::SeqCst);
//!                 }
//!                 Ok(())
//!             })
//!         })
//!         .name("counter")
//!         .spawn()
//!         .unwrap()
//! };
//!
//! counter.tell(msg(2u32), Options::new(), None);
//! counter.tell(msg(3u32), Options::new(), None);
//! tokio::time::sleep(std::time::Duration::from_millis(100)).await;
//! assert_eq!(hits.load(Ordering::SeqCst), 5);
//! system.shutdown();
//! # }
//! ```

pub mod behavior;
pub mod config;
pub mod envelope;
pub mod error;
pub mod executor;
pub mod logging;
pub mod mailbox;
pub mod mock;
pub mod signal;
pub mod supervision;
pub mod system;

pub use behavior::{from_fn, Agent, Behavior, BehaviorFactory};
pub use config::SystemConfig;
pub use envelope::{msg, Envelope, Message, Options, ThreadId};
pub use error::{BehaviorError, SpawnError};
pub use executor::{
    task, BoundedExecutor, PriorityArbiter, PriorityExecutor, ScheduledExecutor, ScheduledHandle,
    Spawner, Task, TaskExecutor, TimeoutExecutor,
};
pub use logging::{setup_tracing, ActorLogger};
pub use mailbox::ActorRef;
pub use signal::{Bounce, BounceReason, Delivery, Failure, Receipt};
pub use supervision::{
    Directive, FailureId, StaticSupervisor, SupervisedFailure, SupervisedRecovery,
};
pub use system::{ActorSystem, AgentBuilder};
