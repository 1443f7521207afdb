//! # Runtime events emitted by the lifecycle, harvesters and subscriber workers.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Lifecycle events**: shutdown requested, terminated, grace exceeded, worker (de)registration
//! - **Buffer events**: epoch sealed, harvest completed/failed, flush retries
//! - **Subscriber events**: overflow and panic reports from the fan-out workers
//!
//! The [`Event`] struct carries optional metadata (source name, epoch, counters, delays).
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use quiesce::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::FlushRetryScheduled)
//!     .with_source("file-sink")
//!     .with_epoch(7)
//!     .with_attempt(2)
//!     .with_delay(Duration::from_millis(250));
//!
//! assert_eq!(ev.kind, EventKind::FlushRetryScheduled);
//! assert_eq!(ev.source.as_deref(), Some("file-sink"));
//! assert_eq!(ev.delay_ms, Some(250));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `source`: subscriber name
    /// - `reason`: panic message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `source`: subscriber name
    /// - `reason`: "full" or "closed"
    SubscriberOverflow,

    // === Lifecycle events ===
    /// Shutdown was requested (signal watcher or explicit call).
    ///
    /// Sets:
    /// - `remaining`: registered workers at the time of the request
    ShutdownRequested,

    /// Lifecycle reached its terminal state: stopped and no worker registered.
    Terminated,

    /// Grace period elapsed before all workers deregistered.
    ///
    /// Sets:
    /// - `remaining`: workers still registered
    /// - `delay_ms`: configured grace (ms)
    GraceExceeded,

    /// A worker registered with the lifecycle.
    ///
    /// Sets:
    /// - `source`: worker name
    /// - `remaining`: registered count after the change
    WorkerRegistered,

    /// A worker deregistered (its guard dropped).
    ///
    /// Sets:
    /// - `source`: worker name
    /// - `remaining`: registered count after the change
    WorkerDeregistered,

    // === Buffer events ===
    /// An append overshot capacity and closed the epoch early.
    ///
    /// Sets:
    /// - `epoch`: the sealed epoch
    /// - `dropped`: appends refused in that epoch
    BufferSealed,

    /// A drained batch was flushed to its sink.
    ///
    /// Sets:
    /// - `source`: sink name
    /// - `epoch`, `records`, `bytes`, `dropped`
    HarvestCompleted,

    /// A drained batch could not be flushed and was discarded.
    ///
    /// Sets:
    /// - `source`: sink name
    /// - `epoch`, `records`, `attempt`
    /// - `reason`: last sink error
    HarvestFailed,

    /// A retryable flush failure; the next attempt is scheduled.
    ///
    /// Sets:
    /// - `source`: sink name
    /// - `epoch`, `attempt` (the failed one)
    /// - `delay_ms`: delay before the next attempt
    /// - `reason`: sink error
    FlushRetryScheduled,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the worker, sink or subscriber involved.
    pub source: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Buffer epoch.
    pub epoch: Option<u64>,
    /// Records in the batch.
    pub records: Option<usize>,
    /// Bytes in the batch.
    pub bytes: Option<usize>,
    /// Appends refused during the epoch.
    pub dropped: Option<u64>,
    /// Flush attempt count (starting from 1).
    pub attempt: Option<u32>,
    /// Delay or grace in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Registered worker count.
    pub remaining: Option<usize>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            source: None,
            reason: None,
            epoch: None,
            records: None,
            bytes: None,
            dropped: None,
            attempt: None,
            delay_ms: None,
            remaining: None,
        }
    }

    /// Attaches a source name.
    #[inline]
    pub fn with_source(mut self, source: impl Into<Arc<str>>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a buffer epoch.
    #[inline]
    pub fn with_epoch(mut self, epoch: u64) -> Self {
        self.epoch = Some(epoch);
        self
    }

    /// Attaches batch size (records and bytes).
    #[inline]
    pub fn with_batch(mut self, records: usize, bytes: usize) -> Self {
        self.records = Some(records);
        self.bytes = Some(bytes);
        self
    }

    /// Attaches the refused-append counter.
    #[inline]
    pub fn with_dropped(mut self, dropped: u64) -> Self {
        self.dropped = Some(dropped);
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches the registered worker count.
    #[inline]
    pub fn with_remaining(mut self, n: usize) -> Self {
        self.remaining = Some(n);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_source(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_source(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }
}
