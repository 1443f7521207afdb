//! # Jitter for flush retry delays.
//!
//! - [`JitterPolicy::None`] — exact delay
//! - [`JitterPolicy::Full`] — uniform in `[0, delay]`
//! - [`JitterPolicy::Equal`] — `delay/2 + uniform[0, delay/2]`

use rand::Rng;
use std::time::Duration;

/// Randomization applied on top of a backoff delay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// No jitter: predictable timing (tests, single harvester).
    #[default]
    None,

    /// Uniform in `[0, delay]`; spreads load the most.
    Full,

    /// Half fixed, half random; keeps roughly 75% of the delay on average.
    Equal,
}

impl JitterPolicy {
    /// Applies the policy to `delay`.
    pub fn apply(&self, delay: Duration) -> Duration {
        let ns = delay.as_nanos().min(u128::from(u64::MAX)) as u64;
        match self {
            JitterPolicy::None => delay,
            JitterPolicy::Full => Duration::from_nanos(rand::rng().random_range(0..=ns)),
            JitterPolicy::Equal => {
                let half = ns / 2;
                Duration::from_nanos(half + rand::rng().random_range(0..=ns - half))
            }
        }
    }
}
