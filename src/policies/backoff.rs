//! # Backoff between flush attempts.
//!
//! The delay before retry `n` (0-indexed) is `first × factor^n`, capped at `max`,
//! then jittered. The base is derived from the attempt number alone, so jitter
//! never feeds back into later delays.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use quiesce::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(50),
//!     max: Duration::from_secs(1),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_millis(50));
//! assert_eq!(backoff.next(2), Duration::from_millis(200));
//! assert_eq!(backoff.next(9), Duration::from_secs(1));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Retry delay policy for sink flushes.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub first: Duration,
    /// Upper bound for any delay.
    pub max: Duration,
    /// Multiplicative growth per attempt (`>= 1.0` recommended).
    pub factor: f64,
    /// Randomization applied to the capped delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// `first = 100ms`, `factor = 2.0`, `max = 5s`, `jitter = Equal`.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(100),
            max: Duration::from_secs(5),
            factor: 2.0,
            jitter: JitterPolicy::Equal,
        }
    }
}

impl BackoffPolicy {
    /// Constant delay without jitter.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            first: delay,
            max: delay,
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Computes the delay before retry number `attempt` (0-indexed).
    ///
    /// Non-finite or negative intermediate values (huge attempts, odd factors)
    /// collapse to `max`.
    pub fn next(&self, attempt: u32) -> Duration {
        let exp = attempt.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if secs.is_finite() && secs >= 0.0 && secs <= self.max.as_secs_f64() {
            Duration::from_secs_f64(secs)
        } else {
            self.max
        };
        self.jitter.apply(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(first_ms: u64, max_ms: u64, factor: f64) -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_millis(first_ms),
            max: Duration::from_millis(max_ms),
            factor,
            jitter: JitterPolicy::None,
        }
    }

    #[test]
    fn test_growth_then_cap() {
        let p = plain(100, 1_000, 2.0);
        let delays: Vec<u128> = (0..6).map(|n| p.next(n).as_millis()).collect();
        assert_eq!(delays, vec![100, 200, 400, 800, 1_000, 1_000]);
    }

    #[test]
    fn test_first_above_max_is_capped() {
        assert_eq!(plain(10_000, 500, 1.0).next(0), Duration::from_millis(500));
    }

    #[test]
    fn test_overflowing_exponent_clamps() {
        assert_eq!(plain(100, 2_000, 10.0).next(u32::MAX), Duration::from_millis(2_000));
    }

    #[test]
    fn test_fixed_is_constant() {
        let p = BackoffPolicy::fixed(Duration::from_millis(30));
        assert!((0..20).all(|n| p.next(n) == Duration::from_millis(30)));
    }

    #[test]
    fn test_equal_jitter_stays_in_upper_half() {
        let p = BackoffPolicy {
            jitter: JitterPolicy::Equal,
            ..plain(400, 400, 1.0)
        };
        for n in 0..50 {
            let d = p.next(n);
            assert!(d >= Duration::from_millis(200) && d <= Duration::from_millis(400), "{d:?}");
        }
    }
}
