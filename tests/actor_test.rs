use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::sleep;

use agentry::mock::Probe;
use agentry::{
    from_fn, msg, ActorSystem, Agent, Behavior, BehaviorError, Bounce, BounceReason, Delivery,
    Envelope, Message, Options, Receipt, SpawnError, SystemConfig, ThreadId,
};

fn system() -> ActorSystem {
    ActorSystem::new(SystemConfig::default())
}

/// Messages from one sender arrive in send order, one at a time.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn delivery_preserves_send_order() {
    let system = system();
    let (probe, mut handle) = Probe::new();
    let target = system
        .agent(move || probe.clone())
        .name("target")
        .spawn()
        .unwrap();

    for n in 1..=20u32 {
        target.tell(msg(n), Options::new(), None);
    }

    handle.expect_started().await;
    for n in 1..=20u32 {
        let (payload, _envelope) = handle.expect_message::<u32>().await;
        assert_eq!(*payload, n);
    }
    system.shutdown();
}

/// `on_message` invocations for one actor never overlap, even on a
/// multi-threaded pool.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn dispatch_never_overlaps() {
    struct Overlap {
        busy: Arc<std::sync::atomic::AtomicBool>,
        overlapped: Arc<std::sync::atomic::AtomicBool>,
    }

    #[async_trait]
    impl Behavior for Overlap {
        async fn on_message(
            &mut self,
            _message: Message,
            _envelope: &Envelope,
            _agent: &mut Agent,
        ) -> Result<(), BehaviorError> {
            use std::sync::atomic::Ordering;
            if self.busy.swap(true, Ordering::SeqCst) {
                self.overlapped.store(true, Ordering::SeqCst);
            }
            sleep(Duration::from_millis(5)).await;
            self.busy.store(false, Ordering::SeqCst);
            Ok(())
        }
    }

    let system = system();
    let busy = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let overlapped = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let target = {
        let busy = busy.clone();
        let overlapped = overlapped.clone();
        system
            .agent(move || Overlap {
                busy: busy.clone(),
                overlapped: overlapped.clone(),
            })
            .spawn()
            .unwrap()
    };

    for n in 0..10u32 {
        target.tell(msg(n), Options::new(), None);
    }
    sleep(Duration::from_millis(300)).await;
    assert!(!overlapped.load(std::sync::atomic::Ordering::SeqCst));
    system.shutdown();
}

/// Over-quota sends bounce with `QuotaExceeded` and are never delivered.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn quota_overflow_bounces() {
    struct Slow {
        delivered: mpsc::UnboundedSender<u32>,
    }

    #[async_trait]
    impl Behavior for Slow {
        async fn on_message(
            &mut self,
            message: Message,
            _envelope: &Envelope,
            _agent: &mut Agent,
        ) -> Result<(), BehaviorError> {
            sleep(Duration::from_millis(150)).await;
            if let Some(n) = message.downcast_ref::<u32>() {
                let _ = self.delivered.send(*n);
            }
            Ok(())
        }
    }

    let system = system();
    let (sender_probe, mut sender_handle) = Probe::new();
    let sender = system
        .agent(move || sender_probe.clone())
        .name("sender")
        .spawn()
        .unwrap();
    let (delivered_tx, mut delivered_rx) = mpsc::unbounded_channel();
    let target = {
        let delivered_tx = delivered_tx.clone();
        system
            .agent(move || Slow {
                delivered: delivered_tx.clone(),
            })
            .name("bounded-target")
            .quota(1)
            .spawn()
            .unwrap()
    };

    // The first message occupies the single quota slot for 150ms; the second
    // arrives well inside that window and must bounce.
    target.tell(msg(1u32), Options::new().with_bounce(), Some(sender.clone()));
    target.tell(msg(2u32), Options::new().with_bounce(), Some(sender.clone()));

    sender_handle.expect_started().await;
    let (bounce, _envelope) = sender_handle.expect_message::<Bounce>().await;
    assert_eq!(bounce.reason, BounceReason::QuotaExceeded { quota: 1 });
    assert_eq!(*bounce.message.clone().downcast::<u32>().unwrap(), 2);

    sleep(Duration::from_millis(300)).await;
    assert_eq!(delivered_rx.try_recv().ok(), Some(1));
    assert!(delivered_rx.try_recv().is_err(), "over-quota message leaked through");
    system.shutdown();
}

/// A sender that asks for both gets a receipt at acceptance and a delivery
/// confirmation after processing, in that order.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn receipt_then_delivery() {
    let system = system();
    let (sender_probe, mut sender_handle) = Probe::new();
    let sender = system
        .agent(move || sender_probe.clone())
        .spawn()
        .unwrap();
    let (target_probe, _target_handle) = Probe::new();
    let target = system.agent(move || target_probe.clone()).spawn().unwrap();

    target.tell(
        msg("payload"),
        Options::new().with_receipt().with_delivery(),
        Some(sender.clone()),
    );

    sender_handle.expect_started().await;
    let (receipt, envelope) = sender_handle.expect_message::<Receipt>().await;
    assert!(receipt.message.downcast_ref::<&str>().is_some());
    assert_eq!(envelope.sender.as_ref().map(|s| s.name()), Some(target.name()));
    let (delivery, _envelope) = sender_handle.expect_message::<Delivery>().await;
    assert!(delivery.options.wants_delivery);
    system.shutdown();
}

/// The thread id set by the sender travels with the delivery envelope and
/// comes back unchanged on every signal reply, correlating the exchange.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn thread_id_correlates_signal_replies() {
    let system = system();
    let (sender_probe, mut sender_handle) = Probe::new();
    let sender = system
        .agent(move || sender_probe.clone())
        .spawn()
        .unwrap();
    let (target_probe, mut target_handle) = Probe::new();
    let target = system.agent(move || target_probe.clone()).spawn().unwrap();

    let thread = ThreadId::next();
    let other = ThreadId::next();
    assert_ne!(thread, other);

    target.tell(
        msg("ping"),
        Options::new()
            .thread(thread)
            .with_receipt()
            .with_delivery(),
        Some(sender.clone()),
    );

    target_handle.expect_started().await;
    let (_payload, envelope) = target_handle.expect_message::<&str>().await;
    assert_eq!(envelope.options.thread, Some(thread));

    sender_handle.expect_started().await;
    let (receipt, _envelope) = sender_handle.expect_message::<Receipt>().await;
    assert_eq!(receipt.options.thread, Some(thread));
    let (delivery, _envelope) = sender_handle.expect_message::<Delivery>().await;
    assert_eq!(delivery.options.thread, Some(thread));

    // Rejections correlate the same way.
    target.dismiss(false);
    target.tell(
        msg("late"),
        Options::new().thread(thread).with_bounce(),
        Some(sender.clone()),
    );
    let (bounce, _envelope) = sender_handle.expect_message::<Bounce>().await;
    assert_eq!(bounce.options.thread, Some(thread));
    system.shutdown();
}

/// Sends to a dismissed actor bounce as `Terminal`.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn terminal_actor_bounces_new_sends() {
    let system = system();
    let (sender_probe, mut sender_handle) = Probe::new();
    let sender = system
        .agent(move || sender_probe.clone())
        .spawn()
        .unwrap();
    let (target_probe, mut target_handle) = Probe::new();
    let target = system.agent(move || target_probe.clone()).spawn().unwrap();

    target.tell(msg(1u32), Options::new(), None);
    target_handle.expect_started().await;
    let _ = target_handle.expect_message::<u32>().await;

    target.dismiss(false);
    assert!(target.is_terminated());
    target_handle.expect_stopped().await;

    target.tell(msg(2u32), Options::new().with_bounce(), Some(sender.clone()));
    sender_handle.expect_started().await;
    let (bounce, _envelope) = sender_handle.expect_message::<Bounce>().await;
    assert_eq!(bounce.reason, BounceReason::Terminal);
    system.shutdown();
}

/// Dismissal runs `on_stop` exactly once, bounces what was queued, and
/// deregisters the actor; repeat dismissals are no-ops.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn dismiss_is_idempotent_and_deregisters() {
    let system = system();
    let (probe, mut handle) = Probe::new();
    let target = system
        .agent(move || probe.clone())
        .name("doomed")
        .spawn()
        .unwrap();
    assert!(system.lookup("doomed").is_some());

    target.tell(msg(1u32), Options::new(), None);
    handle.expect_started().await;
    let _ = handle.expect_message::<u32>().await;

    target.dismiss(false);
    target.dismiss(false);
    target.dismiss(true);

    handle.expect_stopped().await;
    handle.expect_silence(Duration::from_millis(100)).await;
    sleep(Duration::from_millis(50)).await;
    assert!(system.lookup("doomed").is_none());
    system.shutdown();
}

/// `restart_self` replays the stop/start hooks on the same behavior
/// instance, preserving its state.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn restart_self_keeps_the_instance() {
    struct Phoenix {
        events: mpsc::UnboundedSender<String>,
        handled: u32,
    }

    #[async_trait]
    impl Behavior for Phoenix {
        async fn on_start(&mut self, _agent: &mut Agent) -> Result<(), BehaviorError> {
            let _ = self.events.send(format!("start:{}", self.handled));
            Ok(())
        }

        async fn on_message(
            &mut self,
            message: Message,
            _envelope: &Envelope,
            agent: &mut Agent,
        ) -> Result<(), BehaviorError> {
            self.handled += 1;
            if message.downcast_ref::<&str>() == Some(&"restart") {
                agent.restart_self();
            }
            Ok(())
        }

        async fn on_stop(&mut self, _agent: &mut Agent) -> Result<(), BehaviorError> {
            let _ = self.events.send(format!("stop:{}", self.handled));
            Ok(())
        }
    }

    let system = system();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let target = {
        let tx = tx.clone();
        system
            .agent(move || Phoenix {
                events: tx.clone(),
                handled: 0,
            })
            .spawn()
            .unwrap()
    };

    target.tell(msg("restart"), Options::new(), None);
    target.tell(msg("plain"), Options::new(), None);
    sleep(Duration::from_millis(200)).await;

    assert_eq!(rx.try_recv().unwrap(), "start:0");
    // The counter survives the in-place restart.
    assert_eq!(rx.try_recv().unwrap(), "stop:1");
    assert_eq!(rx.try_recv().unwrap(), "start:1");
    system.shutdown();
}

/// An effect requested from the `on_start` replayed by `restart_self` is
/// honored, exactly as it would be on a first start.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn effect_from_replayed_start_is_applied() {
    struct Bail {
        events: mpsc::UnboundedSender<&'static str>,
        starts: u32,
    }

    #[async_trait]
    impl Behavior for Bail {
        async fn on_start(&mut self, agent: &mut Agent) -> Result<(), BehaviorError> {
            self.starts += 1;
            let _ = self.events.send("start");
            // The second start is the replay; bail out of it.
            if self.starts > 1 {
                agent.dismiss_self();
            }
            Ok(())
        }

        async fn on_message(
            &mut self,
            _message: Message,
            _envelope: &Envelope,
            agent: &mut Agent,
        ) -> Result<(), BehaviorError> {
            agent.restart_self();
            Ok(())
        }

        async fn on_stop(&mut self, _agent: &mut Agent) -> Result<(), BehaviorError> {
            let _ = self.events.send("stop");
            Ok(())
        }
    }

    let system = system();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let target = {
        let tx = tx.clone();
        system
            .agent(move || Bail {
                events: tx.clone(),
                starts: 0,
            })
            .spawn()
            .unwrap()
    };

    target.tell(msg(()), Options::new(), None);
    sleep(Duration::from_millis(200)).await;

    assert!(target.is_terminated(), "dismissal from the replayed start was dropped");
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    // First start, restart (stop + start), then the dismissal's final stop.
    assert_eq!(events, vec!["start", "stop", "start", "stop"]);
    system.shutdown();
}

/// A behavior swapped in with `set_behavior` governs the next message, not
/// the one in flight.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn set_behavior_takes_effect_next_message() {
    let system = system();
    let (tx, mut rx) = mpsc::unbounded_channel::<&'static str>();
    let target = {
        let tx = tx.clone();
        system
            .agent(move || {
                let tx = tx.clone();
                from_fn(move |_message, _envelope, agent| {
                    let _ = tx.send("old");
                    let tx = tx.clone();
                    agent.set_behavior(Box::new(from_fn(move |_message, _envelope, _agent| {
                        let _ = tx.send("new");
                        Ok(())
                    })));
                    Ok(())
                })
            })
            .spawn()
            .unwrap()
    };

    target.tell(msg(()), Options::new(), None);
    target.tell(msg(()), Options::new(), None);
    sleep(Duration::from_millis(200)).await;

    assert_eq!(rx.try_recv().unwrap(), "old");
    assert_eq!(rx.try_recv().unwrap(), "new");
    system.shutdown();
}

/// Names must be unique; anonymous actors get generated names.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn registry_enforces_unique_names() {
    let system = system();
    let (probe, _handle) = Probe::new();
    let first = probe.clone();
    system
        .agent(move || first.clone())
        .name("singleton")
        .spawn()
        .unwrap();

    let second = probe.clone();
    let duplicate = system.agent(move || second.clone()).name("singleton").spawn();
    assert!(matches!(duplicate, Err(SpawnError::DuplicateName(ref n)) if n == "singleton"));

    let anon = system.agent(move || probe.clone()).spawn().unwrap();
    assert!(anon.name().contains("agent-"));
    assert!(system.lookup(anon.name()).is_some());
    system.shutdown();
}

/// A shut-down system dismisses its actors and refuses new spawns.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shutdown_refuses_new_spawns() {
    let system = system();
    let (probe, mut handle) = Probe::new();
    let live = probe.clone();
    let target = system.agent(move || live.clone()).spawn().unwrap();
    target.tell(msg(1u32), Options::new(), None);
    handle.expect_started().await;
    let _ = handle.expect_message::<u32>().await;

    system.shutdown();
    handle.expect_stopped().await;
    assert!(target.is_terminated());

    let refused = system.agent(move || probe.clone()).spawn();
    assert!(matches!(refused, Err(SpawnError::SystemShutdown)));
}
