//! # Admission gate with in-flight tracking.
//!
//! [`AdmissionGate`] decides whether new concurrent operations may begin on a shared
//! structure and counts how many are currently running. A harvester flips the gate
//! off, waits until the counter reaches zero, and only then touches the structure.
//!
//! ## Rules
//! - `enter()` never blocks: it either admits (counter +1) or refuses.
//! - `disable()` never waits for drain; use [`AdmissionGate::wait_drained`] or
//!   [`AdmissionGate::spin_until_drained`] afterwards.
//! - `is_disabled()` is true **only** when the gate is off **and** nothing is in flight.
//! - An `enter()` racing a `disable()` may still be admitted; the drain wait covers it.
//!
//! ## Two-phase enter
//! ```text
//! enter():
//!   enabled? ── no ──► false                       (counter untouched)
//!     │ yes
//!   in_flight += 1
//!   enabled? ── no ──► in_flight -= 1 ─► false     (lost the race with disable)
//!     │ yes
//!   true
//! ```
//! `disable()` stores `enabled = false` and then reads the counter; both sides use
//! sequentially consistent operations, so either the entering thread sees the gate
//! closed, or the disabling side sees the increment.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use tokio::sync::Notify;

use crate::error::GateError;

/// Toggle plus in-flight counter controlling concurrent admission.
///
/// Lock-free on every path except [`wait_drained`](Self::wait_drained), which parks
/// the caller on a [`Notify`] until the gate is quiesced.
pub struct AdmissionGate {
    enabled: AtomicBool,
    in_flight: AtomicI64,
    drained: Notify,
}

impl AdmissionGate {
    /// Creates a gate with the given initial state.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            in_flight: AtomicI64::new(0),
            drained: Notify::new(),
        }
    }

    /// Returns true if new operations are currently admitted.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Returns true if the gate is closed **and** no admitted operation is still running.
    ///
    /// This is the only state in which the guarded resource may be harvested.
    #[inline]
    pub fn is_disabled(&self) -> bool {
        !self.enabled.load(Ordering::SeqCst) && self.in_flight.load(Ordering::SeqCst) == 0
    }

    /// Number of operations admitted but not yet left.
    #[inline]
    pub fn in_flight(&self) -> i64 {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Opens the gate. Returns `true` if this call performed the `false → true` transition.
    pub fn enable(&self) -> bool {
        self.enabled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Closes the gate. Returns `true` if this call performed the `true → false` transition.
    ///
    /// Does not wait for in-flight operations.
    pub fn disable(&self) -> bool {
        let flipped = self
            .enabled
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if flipped && self.in_flight.load(Ordering::SeqCst) == 0 {
            self.drained.notify_waiters();
        }
        flipped
    }

    /// Tries to register one in-flight operation.
    ///
    /// Returns `false` without touching the counter if the gate is observed closed,
    /// and `false` after undoing the increment if the gate closed mid-way.
    pub fn enter(&self) -> bool {
        if !self.enabled.load(Ordering::SeqCst) {
            return false;
        }
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        if !self.enabled.load(Ordering::SeqCst) {
            self.release();
            return false;
        }
        true
    }

    /// Unregisters one in-flight operation.
    ///
    /// # Errors
    /// Returns [`GateError::Unbalanced`] when there was no matching `enter()`.
    /// The decrement is undone before returning, so the counter never stays negative.
    pub fn leave(&self) -> Result<(), GateError> {
        let prev = self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if prev <= 0 {
            let restored = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            return Err(GateError::Unbalanced {
                in_flight: restored,
            });
        }
        if prev == 1 && !self.enabled.load(Ordering::SeqCst) {
            self.drained.notify_waiters();
        }
        Ok(())
    }

    /// Scoped form of [`enter`](Self::enter): the returned ticket calls `leave()` on drop.
    #[must_use = "dropping the ticket immediately leaves the gate"]
    pub fn try_admit(&self) -> Option<Admission<'_>> {
        self.enter().then(|| Admission { gate: self })
    }

    /// Waits until [`is_disabled`](Self::is_disabled) holds.
    ///
    /// Parks on a notification fired by the last `leave()` after a `disable()`
    /// (or by `disable()` itself when nothing is in flight). Returns immediately
    /// if the gate is already quiesced.
    pub async fn wait_drained(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_disabled() {
                return;
            }
            notified.await;
        }
    }

    /// Blocking busy-poll until [`is_disabled`](Self::is_disabled) holds.
    ///
    /// For synchronous harvesters; drains are expected to be short.
    pub fn spin_until_drained(&self) {
        while !self.is_disabled() {
            std::hint::spin_loop();
        }
    }

    /// Rolls back an increment made by `enter()`; never observed by callers as `leave()`.
    fn release(&self) {
        let prev = self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if prev == 1 && !self.enabled.load(Ordering::SeqCst) {
            self.drained.notify_waiters();
        }
    }
}

impl Default for AdmissionGate {
    /// An open gate with nothing in flight.
    fn default() -> Self {
        Self::new(true)
    }
}

impl fmt::Debug for AdmissionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionGate")
            .field("enabled", &self.is_enabled())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

/// Ticket for one admitted operation; leaves the gate when dropped.
#[derive(Debug)]
pub struct Admission<'a> {
    gate: &'a AdmissionGate,
}

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        let left = self.gate.leave();
        debug_assert!(left.is_ok(), "admission ticket left an unbalanced gate");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_refused_admission_keeps_in_flight_count() {
        let gate = AdmissionGate::new(true);
        let held = gate.try_admit().unwrap();
        gate.disable();

        assert!(gate.try_admit().is_none());
        assert!(!gate.enter());
        assert_eq!(gate.in_flight(), 1);
        assert!(!gate.is_disabled());

        drop(held);
        assert_eq!(gate.in_flight(), 0);
        assert!(gate.is_disabled());
    }

    #[test]
    fn test_enable_disable_report_transitions() {
        let gate = AdmissionGate::new(false);
        assert!(!gate.is_enabled());
        assert!(gate.enable());
        assert!(!gate.enable(), "second enable is not a transition");
        assert!(gate.disable());
        assert!(!gate.disable(), "second disable is not a transition");
    }

    #[test]
    fn test_enter_refused_when_closed() {
        let gate = AdmissionGate::new(false);
        assert!(!gate.enter());
        assert_eq!(gate.in_flight(), 0);
        assert!(gate.is_disabled());
    }

    #[test]
    fn test_is_disabled_requires_zero_in_flight() {
        let gate = AdmissionGate::new(true);
        assert!(gate.enter());
        assert!(!gate.is_disabled());

        gate.disable();
        assert!(!gate.is_disabled(), "still one operation in flight");
        assert!(!gate.enter(), "closed gate refuses new work");

        gate.leave().unwrap();
        assert!(gate.is_disabled());
    }

    #[test]
    fn test_unbalanced_leave_is_reported_and_self_heals() {
        let gate = AdmissionGate::default();
        let err = gate.leave().unwrap_err();
        assert_eq!(err, GateError::Unbalanced { in_flight: 0 });
        assert_eq!(gate.in_flight(), 0);

        assert!(gate.enter());
        gate.leave().unwrap();
        assert!(gate.leave().is_err());
        assert_eq!(gate.in_flight(), 0);
    }

    #[test]
    fn test_admission_ticket_leaves_on_drop() {
        let gate = AdmissionGate::default();
        {
            let _ticket = gate.try_admit().expect("gate is open");
            assert_eq!(gate.in_flight(), 1);
        }
        assert_eq!(gate.in_flight(), 0);

        gate.disable();
        assert!(gate.try_admit().is_none());
    }

    #[test]
    fn test_paired_enter_leave_returns_to_zero() {
        let gate = Arc::new(AdmissionGate::default());
        let admitted = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = Arc::clone(&gate);
                let admitted = Arc::clone(&admitted);
                thread::spawn(move || {
                    for _ in 0..10_000 {
                        if gate.enter() {
                            admitted.fetch_add(1, Ordering::Relaxed);
                            assert!(gate.in_flight() >= 1);
                            gate.leave().unwrap();
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(admitted.load(Ordering::Relaxed), 80_000);
        assert_eq!(gate.in_flight(), 0);
    }

    #[test]
    fn test_disable_racing_enter_drains_cleanly() {
        let gate = Arc::new(AdmissionGate::default());
        let inside = Arc::new(AtomicI64::new(0));

        let producers: Vec<_> = (0..4)
            .map(|_| {
                let gate = Arc::clone(&gate);
                let inside = Arc::clone(&inside);
                thread::spawn(move || {
                    for _ in 0..50_000 {
                        if let Some(_ticket) = gate.try_admit() {
                            inside.fetch_add(1, Ordering::SeqCst);
                            std::hint::spin_loop();
                            inside.fetch_sub(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();

        thread::sleep(Duration::from_millis(5));
        gate.disable();
        gate.spin_until_drained();
        assert_eq!(inside.load(Ordering::SeqCst), 0, "nobody inside after drain");
        assert!(!gate.enter());

        for p in producers {
            p.join().unwrap();
        }
        assert_eq!(gate.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_wait_drained_returns_immediately_when_quiesced() {
        let gate = AdmissionGate::new(false);
        gate.wait_drained().await;
        assert!(gate.is_disabled());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_wait_drained_wakes_on_last_leave() {
        let gate = Arc::new(AdmissionGate::default());
        assert!(gate.enter());
        assert!(gate.enter());
        gate.disable();

        let waiter = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.wait_drained().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        gate.leave().unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished(), "one operation still in flight");

        gate.leave().unwrap();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter woke")
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_wait_drained_wakes_on_disable_when_idle() {
        let gate = Arc::new(AdmissionGate::default());
        let waiter = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.wait_drained().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished(), "open gate is not drained");
        gate.disable();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter woke")
            .unwrap();
    }
}
