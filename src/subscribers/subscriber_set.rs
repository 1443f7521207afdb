//! # Non-blocking event fan-out to multiple subscribers.
//!
//! Provides [`SubscriberSet`] — distributes events to multiple subscribers
//! concurrently without blocking the publisher.
//!
//! ## Architecture
//! ```text
//! Bus ──► listen() ──► emit(event)
//!                        │
//!                        ├──► [queue 1] ──► worker 1 ──► subscriber1.on_event()
//!                        │    (bounded)         └──────► panic → SubscriberPanicked
//!                        └──► [queue N] ──► worker N ──► subscriberN.on_event()
//! ```
//!
//! ## Rules
//! - **No cross-subscriber ordering**: subscriber A may process event N while B processes N+5
//! - **Overflow**: event dropped for that subscriber only, `SubscriberOverflow` published
//! - **Non-blocking**: `emit()` returns immediately (uses `try_send`)
//! - **Per-subscriber FIFO**: each subscriber sees events in order
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state inconsistent
//! if a subscriber panics while holding a lock.

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::events::{Bus, Event};
use crate::subscribers::Subscribe;

/// Per-subscriber channel metadata.
struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator for multiple event subscribers.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);
            let bus_for_worker = bus.clone();

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = sub.on_event(ev.as_ref());

                    if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await
                    {
                        let any = &*panic_err;
                        let info = if let Some(msg) = any.downcast_ref::<&'static str>() {
                            (*msg).to_string()
                        } else if let Some(msg) = any.downcast_ref::<String>() {
                            msg.clone()
                        } else {
                            "unknown panic".to_string()
                        };
                        bus_for_worker.publish(Event::subscriber_panicked(sub.name(), info));
                    }
                }
            });
            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }
        Self {
            channels,
            workers,
            bus,
        }
    }

    /// Number of subscribers in the set.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Returns true if the set has no subscribers.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Emits an event to all subscribers.
    ///
    /// - Uses `try_send` (non-blocking)
    /// - On queue full/closed: drops the event for that subscriber, publishes `SubscriberOverflow`
    /// - Overflow events are never re-published on overflow (no feedback loop)
    pub fn emit(&self, event: Arc<Event>) {
        let is_overflow_evt = event.is_subscriber_overflow();

        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !is_overflow_evt {
                self.bus
                    .publish(Event::subscriber_overflow(channel.name, reason));
            }
        }
    }

    /// Spawns the bus listener that feeds this set.
    ///
    /// The set keeps its own bus handle, so the listener runs until the returned
    /// handle is aborted or the runtime shuts down. A listener that falls more
    /// than the bus capacity behind skips the missed events and logs the gap.
    pub fn listen(self: Arc<Self>) -> JoinHandle<()> {
        let mut rx = self.bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => self.emit(Arc::new(ev)),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        debug!(skipped = n, "subscriber listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Gracefully shuts down all subscriber workers.
    ///
    /// 1. Drops all channel senders (workers see channel closed)
    /// 2. Awaits all worker tasks to finish
    pub async fn shutdown(self) {
        drop(self.channels);

        for h in self.workers {
            let _ = h.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter {
        seen: AtomicUsize,
    }

    #[async_trait]
    impl Subscribe for Counter {
        async fn on_event(&self, _ev: &Event) {
            self.seen.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> &'static str {
            "counter"
        }
    }

    struct Panicky;

    #[async_trait]
    impl Subscribe for Panicky {
        async fn on_event(&self, ev: &Event) {
            if ev.kind == EventKind::Terminated {
                panic!("boom");
            }
        }

        fn name(&self) -> &'static str {
            "panicky"
        }
    }

    #[tokio::test]
    async fn test_emit_reaches_every_subscriber() {
        let bus = Bus::new(16);
        let a = Arc::new(Counter::default());
        let b = Arc::new(Counter::default());
        let subs: Vec<Arc<dyn Subscribe>> = vec![a.clone(), b.clone()];
        let set = SubscriberSet::new(subs, bus);
        assert_eq!(set.len(), 2);

        set.emit(Arc::new(Event::new(EventKind::ShutdownRequested)));
        set.emit(Arc::new(Event::new(EventKind::Terminated)));
        set.shutdown().await;

        assert_eq!(a.seen.load(Ordering::SeqCst), 2);
        assert_eq!(b.seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_panic_is_reported_on_bus() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Panicky)];
        let set = SubscriberSet::new(subs, bus);

        set.emit(Arc::new(Event::new(EventKind::Terminated)));
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert_eq!(ev.source.as_deref(), Some("panicky"));
        assert_eq!(ev.reason.as_deref(), Some("boom"));
        set.shutdown().await;
    }

    #[tokio::test]
    async fn test_listen_forwards_bus_events() {
        let bus = Bus::new(16);
        let counter = Arc::new(Counter::default());
        let subs: Vec<Arc<dyn Subscribe>> = vec![counter.clone()];
        let set = Arc::new(SubscriberSet::new(subs, bus.clone()));
        let listener = Arc::clone(&set).listen();

        bus.publish(Event::new(EventKind::WorkerRegistered));
        for _ in 0..100 {
            if counter.seen.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(counter.seen.load(Ordering::SeqCst), 1);
        listener.abort();
    }
}
