//! # Runtime configuration.
//!
//! Provides centralized settings for the three moving parts:
//! - [`LifecycleConfig`] shutdown grace and event bus sizing
//! - [`BufferConfig`] append buffer capacity
//! - [`HarvestConfig`] harvest cadence and flush retry policy
//!
//! ## Sentinel values
//! - `grace = 0s` → wait for termination without a deadline
//! - `max_flush_attempts = 0` → retry retryable flush failures until shutdown

use std::time::Duration;

use crate::buffer::frame::OVERHEAD;
use crate::policies::BackoffPolicy;

/// Settings of a [`Lifecycle`](crate::Lifecycle).
///
/// ## Field semantics
/// - `grace`: maximum wait for registered workers after shutdown (`0s` = no deadline)
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
#[derive(Clone, Debug)]
pub struct LifecycleConfig {
    /// Maximum time to wait for workers to deregister once shutdown was requested.
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow listeners that lag behind more than `bus_capacity` events skip older items.
    pub bus_capacity: usize,
}

impl LifecycleConfig {
    /// Returns the grace period as an `Option`.
    ///
    /// - `None` → wait for termination indefinitely
    /// - `Some(d)` → give up after `d`
    #[inline]
    pub fn grace_limit(&self) -> Option<Duration> {
        if self.grace == Duration::ZERO {
            None
        } else {
            Some(self.grace)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for LifecycleConfig {
    /// Default configuration:
    ///
    /// - `grace = 30s`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(30),
            bus_capacity: 1024,
        }
    }
}

/// Settings of an [`AppendBuffer`](crate::AppendBuffer).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferConfig {
    /// Storage size in bytes, framing included.
    pub capacity: usize,
}

impl BufferConfig {
    /// Largest payload guaranteed to fit into an empty buffer.
    #[inline]
    pub fn effective_capacity(&self) -> usize {
        self.capacity.saturating_sub(OVERHEAD)
    }
}

impl Default for BufferConfig {
    /// `capacity = 64 KiB`.
    fn default() -> Self {
        Self {
            capacity: 64 * 1024,
        }
    }
}

/// Settings of a [`Harvester`](crate::Harvester).
///
/// ## Field semantics
/// - `interval`: time between two regular harvests
/// - `slice`: granularity at which the interval wait re-checks the seal flag
/// - `max_flush_attempts`: flush attempts per batch (`0` = until shutdown)
/// - `backoff`: delay between flush attempts
#[derive(Clone, Copy, Debug)]
pub struct HarvestConfig {
    /// Time between two regular harvests.
    pub interval: Duration,

    /// Wake-up granularity while waiting for the next harvest.
    ///
    /// A sealed buffer is noticed at most one slice late.
    pub slice: Duration,

    /// Flush attempts per batch before it is discarded (`0` = keep retrying until shutdown).
    pub max_flush_attempts: u32,

    /// Delay policy between flush attempts.
    pub backoff: BackoffPolicy,
}

impl HarvestConfig {
    /// Returns the attempt cap as an `Option` (`None` = unlimited).
    #[inline]
    pub fn attempt_limit(&self) -> Option<u32> {
        if self.max_flush_attempts == 0 {
            None
        } else {
            Some(self.max_flush_attempts)
        }
    }

    /// Returns a slice clamped to `(0, interval]`.
    #[inline]
    pub fn slice_clamped(&self) -> Duration {
        self.slice
            .max(Duration::from_millis(1))
            .min(self.interval.max(Duration::from_millis(1)))
    }
}

impl Default for HarvestConfig {
    /// Default configuration:
    ///
    /// - `interval = 1s`
    /// - `slice = 50ms`
    /// - `max_flush_attempts = 5`
    /// - `backoff = BackoffPolicy::default()`
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            slice: Duration::from_millis(50),
            max_flush_attempts: 5,
            backoff: BackoffPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_grace_means_no_deadline() {
        let cfg = LifecycleConfig {
            grace: Duration::ZERO,
            ..LifecycleConfig::default()
        };
        assert_eq!(cfg.grace_limit(), None);
        assert_eq!(LifecycleConfig::default().grace_limit(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_effective_capacity_reserves_overhead() {
        assert_eq!(BufferConfig { capacity: 100 }.effective_capacity(), 95);
        assert_eq!(BufferConfig { capacity: 3 }.effective_capacity(), 0);
    }

    #[test]
    fn test_slice_clamped_to_interval() {
        let cfg = HarvestConfig {
            interval: Duration::from_millis(20),
            slice: Duration::from_secs(5),
            ..HarvestConfig::default()
        };
        assert_eq!(cfg.slice_clamped(), Duration::from_millis(20));

        let cfg = HarvestConfig {
            slice: Duration::ZERO,
            ..HarvestConfig::default()
        };
        assert_eq!(cfg.slice_clamped(), Duration::from_millis(1));
        assert_eq!(cfg.attempt_limit(), Some(5));
    }
}
