//! # Interruptible sleeps.
//!
//! Both sleeps end early once shutdown is requested. [`Lifecycle::sleep_until`]
//! additionally polls caller-supplied flags between slices.
//!
//! ```text
//! loop:
//!   stopped?          → Wake::Stopped
//!   conditions[i]?    → Wake::Condition(i + 1)   (first set flag wins)
//!   deadline reached? → Wake::Timeout
//!   wait min(slice, remaining), cut short by the stop signal
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::{self, Instant};

use super::controller::Lifecycle;

/// Smallest slice used by [`Lifecycle::sleep_until`].
const MIN_SLICE: Duration = Duration::from_millis(1);

/// Why [`Lifecycle::sleep_until`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// Shutdown was requested.
    Stopped,
    /// The condition at this 1-based position was observed set.
    Condition(usize),
    /// The full duration elapsed.
    Timeout,
}

impl Wake {
    /// Returns true for [`Wake::Stopped`].
    #[inline]
    pub fn is_stopped(&self) -> bool {
        matches!(self, Wake::Stopped)
    }
}

impl Lifecycle {
    /// Sleeps for `duration` unless shutdown is requested first.
    ///
    /// Returns `true` if the sleep was cut short (or shutdown had already been
    /// requested), `false` if the full duration elapsed.
    pub async fn sleep(&self, duration: Duration) -> bool {
        if !self.is_alive() {
            return true;
        }
        tokio::select! {
            biased;
            _ = self.stop.cancelled() => true,
            _ = time::sleep(duration) => false,
        }
    }

    /// Sleeps up to `total` in steps of `slice`, returning early on shutdown or
    /// as soon as one of `conditions` is observed set.
    ///
    /// The stop check comes first, then the conditions in order, so with several
    /// flags set the lowest position is reported. A set flag is noticed at most
    /// one `slice` late; shutdown is noticed immediately.
    pub async fn sleep_until(
        &self,
        total: Duration,
        slice: Duration,
        conditions: &[&AtomicBool],
    ) -> Wake {
        let slice = slice.max(MIN_SLICE);
        // `None`: too far out to represent, never times out.
        let deadline = Instant::now().checked_add(total);

        loop {
            if !self.is_alive() {
                return Wake::Stopped;
            }
            if let Some(i) = conditions.iter().position(|c| c.load(Ordering::Acquire)) {
                return Wake::Condition(i + 1);
            }
            let step = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Wake::Timeout;
                    }
                    slice.min(deadline - now)
                }
                None => slice,
            };
            self.sleep(step).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LifecycleConfig;
    use std::sync::Arc;

    fn lifecycle() -> Arc<Lifecycle> {
        Lifecycle::new(LifecycleConfig::default())
    }

    fn assert_about(elapsed: Duration, expected: Duration) {
        assert!(
            elapsed >= expected && elapsed <= expected + Duration::from_millis(2),
            "elapsed {elapsed:?}, expected about {expected:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_runs_full_duration_while_alive() {
        let lc = lifecycle();
        let started = Instant::now();
        assert!(!lc.sleep(Duration::from_millis(300)).await);
        assert_about(started.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_after_shutdown_returns_at_once() {
        let lc = lifecycle();
        lc.shutdown();
        let started = Instant::now();
        assert!(lc.sleep(Duration::from_secs(3600)).await);
        assert!(lc.sleep(Duration::from_secs(3600)).await);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_wakes_every_sleeper() {
        let lc = lifecycle();
        let sleepers: Vec<_> = (0..3)
            .map(|_| {
                let lc = Arc::clone(&lc);
                tokio::spawn(async move { lc.sleep(Duration::from_secs(60)).await })
            })
            .collect();

        time::sleep(Duration::from_millis(10)).await;
        lc.shutdown();
        for s in sleepers {
            assert!(s.await.unwrap());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_condition_wakes_within_one_slice() {
        let lc = lifecycle();
        let flags: Arc<[AtomicBool; 3]> = Arc::new(Default::default());

        let setter = {
            let flags = Arc::clone(&flags);
            tokio::spawn(async move {
                time::sleep(Duration::from_millis(250)).await;
                flags[2].store(true, Ordering::Release);
            })
        };

        let started = Instant::now();
        let wake = lc
            .sleep_until(
                Duration::from_millis(1000),
                Duration::from_millis(100),
                &[&flags[0], &flags[1], &flags[2]],
            )
            .await;
        let elapsed = started.elapsed();

        setter.await.unwrap();
        assert_eq!(wake, Wake::Condition(3));
        assert!(elapsed >= Duration::from_millis(250), "{elapsed:?}");
        assert!(elapsed <= Duration::from_millis(350), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_lowest_set_condition_wins() {
        let lc = lifecycle();
        let a = AtomicBool::new(false);
        let b = AtomicBool::new(true);
        let c = AtomicBool::new(true);
        let wake = lc
            .sleep_until(Duration::from_secs(1), Duration::from_millis(10), &[&a, &b, &c])
            .await;
        assert_eq!(wake, Wake::Condition(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_beats_conditions() {
        let lc = lifecycle();
        let set = AtomicBool::new(true);
        lc.shutdown();
        let wake = lc
            .sleep_until(Duration::from_secs(1), Duration::from_millis(10), &[&set])
            .await;
        assert_eq!(wake, Wake::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_without_conditions() {
        let lc = lifecycle();
        let started = Instant::now();
        let wake = lc
            .sleep_until(Duration::from_millis(250), Duration::from_millis(100), &[])
            .await;
        assert_eq!(wake, Wake::Timeout);
        assert_about(started.elapsed(), Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_a_slice() {
        let lc = lifecycle();
        let stopper = {
            let lc = Arc::clone(&lc);
            tokio::spawn(async move {
                time::sleep(Duration::from_millis(130)).await;
                lc.shutdown();
            })
        };

        let started = Instant::now();
        let wake = lc
            .sleep_until(Duration::from_secs(10), Duration::from_secs(1), &[])
            .await;
        stopper.await.unwrap();
        assert_eq!(wake, Wake::Stopped);
        assert_about(started.elapsed(), Duration::from_millis(130));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_total_still_wakes() {
        let lc = lifecycle();
        let flag = Arc::new(AtomicBool::new(false));
        let setter = {
            let flag = Arc::clone(&flag);
            tokio::spawn(async move {
                time::sleep(Duration::from_millis(40)).await;
                flag.store(true, Ordering::Release);
            })
        };

        let wake = lc
            .sleep_until(Duration::MAX, Duration::from_millis(10), &[&flag])
            .await;
        setter.await.unwrap();
        assert_eq!(wake, Wake::Condition(1));

        lc.shutdown();
        let wake = lc
            .sleep_until(Duration::MAX, Duration::from_millis(10), &[])
            .await;
        assert_eq!(wake, Wake::Stopped);
    }
}
