//! # Lifecycle: alive/terminated state, sticky stop signal, worker accounting.
//!
//! ## State machine
//! ```text
//!            shutdown()                      last WorkerGuard dropped
//! Running ───────────────► Stopping ────────────────────────────────► Terminated
//!    │                                                                    ▲
//!    └──── shutdown() with registered == 0 ──────────────────────────────┘
//! ```
//!
//! ## Rules
//! - `shutdown()` transitions exactly once; concurrent callers see `false`.
//! - The stop signal is a one-shot latch: once tripped, every current and future
//!   sleeper observes it immediately.
//! - `Terminated` is reached only when stopped **and** no worker is registered,
//!   and it is absorbing.
//! - Registration is scoped: a [`WorkerGuard`] deregisters on drop, panics included.
//!
//! ## Ordering
//! `shutdown()` clears `alive` and then reads `registered`; deregistration
//! decrements `registered` and then reads `alive`. Both sides are sequentially
//! consistent, so at least one of them observes the other and terminates.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::guard::WorkerGuard;
use crate::config::LifecycleConfig;
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};

/// Coarse lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Accepting work; sleepers wait their full duration.
    Running,
    /// Shutdown requested; waiting for registered workers to leave.
    Stopping,
    /// Stopped and drained of workers.
    Terminated,
}

/// Explicit lifecycle context shared by workers as `Arc<Lifecycle>`.
pub struct Lifecycle {
    pub(super) cfg: LifecycleConfig,
    pub(super) bus: Bus,
    alive: AtomicBool,
    terminated_flag: AtomicBool,
    registered: AtomicUsize,
    pub(super) stop: CancellationToken,
    terminated: CancellationToken,
    pub(super) watcher_installed: AtomicBool,
    listener: Option<JoinHandle<()>>,
}

impl Lifecycle {
    /// Creates a running lifecycle without subscribers.
    ///
    /// Use [`Lifecycle::builder`] to attach event subscribers.
    pub fn new(cfg: LifecycleConfig) -> Arc<Self> {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        Arc::new(Self::new_internal(cfg, bus, None))
    }

    pub(super) fn new_internal(
        cfg: LifecycleConfig,
        bus: Bus,
        listener: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            cfg,
            bus,
            alive: AtomicBool::new(true),
            terminated_flag: AtomicBool::new(false),
            registered: AtomicUsize::new(0),
            stop: CancellationToken::new(),
            terminated: CancellationToken::new(),
            watcher_installed: AtomicBool::new(false),
            listener,
        }
    }

    /// Configuration this lifecycle was built with.
    pub fn config(&self) -> &LifecycleConfig {
        &self.cfg
    }

    /// Event bus shared with workers and harvesters.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Returns true until shutdown is requested.
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Returns true once stopped with no registered worker left.
    #[inline]
    pub fn is_terminated(&self) -> bool {
        self.terminated_flag.load(Ordering::SeqCst)
    }

    /// Number of currently registered workers.
    #[inline]
    pub fn registered(&self) -> usize {
        self.registered.load(Ordering::SeqCst)
    }

    /// Current coarse state.
    pub fn state(&self) -> LifecycleState {
        if self.is_terminated() {
            LifecycleState::Terminated
        } else if self.is_alive() {
            LifecycleState::Running
        } else {
            LifecycleState::Stopping
        }
    }

    /// Token cancelled when shutdown is requested.
    ///
    /// Handy for `select!`-ing external futures against the stop signal.
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Completes when shutdown has been requested.
    pub async fn stopped(&self) {
        self.stop.cancelled().await
    }

    /// Requests shutdown.
    ///
    /// Returns `true` if this call performed the `Running → Stopping` transition.
    /// With no registered worker the lifecycle terminates within this call.
    pub fn shutdown(&self) -> bool {
        if self
            .alive
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        self.stop.cancel();
        let remaining = self.registered.load(Ordering::SeqCst);
        info!(remaining, "shutdown requested");
        self.bus
            .publish(Event::new(EventKind::ShutdownRequested).with_remaining(remaining));

        if remaining == 0 {
            self.terminate();
        }
        true
    }

    /// Registers a worker; it stays registered until the guard is dropped.
    ///
    /// Registering after shutdown is allowed (the worker simply sees the stop
    /// signal at once) and delays termination until its guard drops.
    pub fn register(self: &Arc<Self>, name: impl Into<Arc<str>>) -> WorkerGuard {
        let name: Arc<str> = name.into();
        let now = self.registered.fetch_add(1, Ordering::SeqCst) + 1;
        if self.is_terminated() {
            warn!(worker = %name, "worker registered after termination");
        } else {
            debug!(worker = %name, registered = now, "worker registered");
        }
        self.bus.publish(
            Event::new(EventKind::WorkerRegistered)
                .with_source(Arc::clone(&name))
                .with_remaining(now),
        );
        WorkerGuard::new(Arc::clone(self), name)
    }

    /// Called by [`WorkerGuard`] on drop.
    pub(super) fn deregister(&self, name: &Arc<str>) {
        let prev = self.registered.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(prev > 0, "deregister without registration");
        let now = prev.saturating_sub(1);
        debug!(worker = %name, registered = now, "worker deregistered");
        self.bus.publish(
            Event::new(EventKind::WorkerDeregistered)
                .with_source(Arc::clone(name))
                .with_remaining(now),
        );

        if now == 0 && !self.alive.load(Ordering::SeqCst) {
            self.terminate();
        }
    }

    /// Completes once the lifecycle is terminated.
    pub async fn wait_terminated(&self) {
        self.terminated.cancelled().await
    }

    /// Waits for termination, bounded by `grace` (`None` = no bound).
    ///
    /// # Errors
    /// [`RuntimeError::GraceExceeded`] with the number of workers still registered.
    pub async fn wait_terminated_within(&self, grace: Option<Duration>) -> Result<(), RuntimeError> {
        let Some(grace) = grace else {
            self.wait_terminated().await;
            return Ok(());
        };

        match tokio::time::timeout(grace, self.wait_terminated()).await {
            Ok(()) => Ok(()),
            Err(_elapsed) => {
                let remaining = self.registered();
                warn!(?grace, remaining, "grace period exceeded");
                self.bus.publish(
                    Event::new(EventKind::GraceExceeded)
                        .with_remaining(remaining)
                        .with_delay(grace),
                );
                Err(RuntimeError::GraceExceeded { grace, remaining })
            }
        }
    }

    fn terminate(&self) {
        if self
            .terminated_flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            info!("lifecycle terminated");
            self.terminated.cancel();
            self.bus.publish(Event::new(EventKind::Terminated));
        }
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("state", &self.state())
            .field("registered", &self.registered())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lifecycle() -> Arc<Lifecycle> {
        Lifecycle::new(LifecycleConfig::default())
    }

    #[test]
    fn test_shutdown_without_workers_terminates_immediately() {
        let lc = lifecycle();
        assert_eq!(lc.state(), LifecycleState::Running);

        assert!(lc.shutdown());
        assert!(!lc.is_alive());
        assert!(lc.is_terminated());
        assert_eq!(lc.state(), LifecycleState::Terminated);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let lc = lifecycle();
        assert!(lc.shutdown());
        assert!(!lc.shutdown());
        assert!(lc.is_terminated());
    }

    #[test]
    fn test_termination_waits_for_last_worker() {
        let lc = lifecycle();
        let first = lc.register("first");
        let second = lc.register("second");
        assert_eq!(lc.registered(), 2);

        lc.shutdown();
        assert_eq!(lc.state(), LifecycleState::Stopping);

        drop(first);
        assert!(!lc.is_terminated());
        drop(second);
        assert!(lc.is_terminated());
        assert_eq!(lc.registered(), 0);
    }

    #[test]
    fn test_deregistering_while_running_does_not_terminate() {
        let lc = lifecycle();
        drop(lc.register("short-lived"));
        assert!(lc.is_alive());
        assert!(!lc.is_terminated());
        assert_eq!(lc.state(), LifecycleState::Running);
    }

    #[test]
    fn test_guard_releases_on_panic() {
        let lc = lifecycle();
        let worker_lc = Arc::clone(&lc);
        let joined = std::thread::spawn(move || {
            let _guard = worker_lc.register("crashy");
            panic!("worker crashed");
        })
        .join();
        assert!(joined.is_err());
        assert_eq!(lc.registered(), 0);

        lc.shutdown();
        assert!(lc.is_terminated());
    }

    #[test]
    fn test_concurrent_shutdown_and_deregistration_always_terminates() {
        for _ in 0..200 {
            let lc = lifecycle();
            let guards: Vec<_> = (0..4).map(|i| lc.register(format!("w{i}"))).collect();

            let droppers: Vec<_> = guards
                .into_iter()
                .map(|g| std::thread::spawn(move || drop(g)))
                .collect();
            let stopper = {
                let lc = Arc::clone(&lc);
                std::thread::spawn(move || lc.shutdown())
            };

            for d in droppers {
                d.join().unwrap();
            }
            assert!(stopper.join().unwrap());
            assert!(lc.is_terminated(), "termination lost in a race");
        }
    }

    #[tokio::test]
    async fn test_wait_terminated_completes_after_drain() {
        let lc = lifecycle();
        let guard = lc.register("worker");

        let waiter = {
            let lc = Arc::clone(&lc);
            tokio::spawn(async move { lc.wait_terminated().await })
        };
        lc.shutdown();
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_grace_exceeded_reports_remaining_workers() {
        let lc = lifecycle();
        let mut rx = lc.bus().subscribe();
        let _stuck = lc.register("stuck");
        lc.shutdown();

        let err = lc
            .wait_terminated_within(Some(Duration::from_millis(100)))
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::GraceExceeded { remaining: 1, .. }));

        let kinds: Vec<EventKind> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|ev| ev.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::WorkerRegistered,
                EventKind::ShutdownRequested,
                EventKind::GraceExceeded
            ]
        );
    }

    #[tokio::test]
    async fn test_events_follow_the_state_machine() {
        let lc = lifecycle();
        let mut rx = lc.bus().subscribe();

        let guard = lc.register("w");
        lc.shutdown();
        drop(guard);

        let kinds: Vec<EventKind> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|ev| ev.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::WorkerRegistered,
                EventKind::ShutdownRequested,
                EventKind::WorkerDeregistered,
                EventKind::Terminated,
            ]
        );
    }
}
