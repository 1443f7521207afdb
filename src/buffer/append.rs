//! # Fixed-capacity, lock-free append buffer.
//!
//! [`AppendBuffer`] hands out disjoint byte ranges by atomically advancing one
//! cursor (bump allocation) and writes one framed record into each range.
//! Appends never block and never retry; an [`AdmissionGate`] decides whether an
//! append may start at all.
//!
//! ## Append path
//! ```text
//! append(payload)
//!   ├─ gate.try_admit()            ── refused ─► false (dropped += 1)
//!   ├─ need = len + OVERHEAD
//!   ├─ begin = cursor.fetch_add(need)
//!   ├─ end <= capacity ─► write frame [begin, end) ─► true
//!   └─ end >  capacity ─► seal epoch (gate.disable) ─► false
//!   (ticket drop ─► gate.leave() on every path)
//! ```
//!
//! ## Epochs
//! - The cursor cannot be rolled back, so one overshooting reservation closes
//!   the epoch: the gate is disabled until the next [`reset`](AppendBuffer::reset).
//! - The harvestable range is `[0, valid_end)`, where `valid_end` is the smaller
//!   of the cursor and the first overshooting reservation's `begin`.
//! - Records larger than the whole buffer are refused up front and do not seal.
//!
//! ## Rules
//! - Single harvester: `disable → drain → snapshot → reset` must not overlap
//!   with another harvest of the same buffer.
//! - For the final record to fit, plan on `capacity − OVERHEAD` usable bytes.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, AtomicUsize, Ordering};

use tracing::{debug, warn};

use super::frame::{self, OVERHEAD};
use super::sink::{Batch, Sink};
use crate::config::BufferConfig;
use crate::error::SinkError;
use crate::gate::AdmissionGate;

/// `sealed_at` value of an epoch that has not overflowed.
const NOT_SEALED: usize = usize::MAX;

/// Lock-free bump-allocated byte store for length-prefixed records.
pub struct AppendBuffer {
    storage: Box<[AtomicU8]>,
    cursor: AtomicUsize,
    sealed_at: AtomicUsize,
    sealed: AtomicBool,
    records: AtomicUsize,
    dropped: AtomicU64,
    epoch: AtomicU64,
    gate: AdmissionGate,
}

impl AppendBuffer {
    /// Creates an open buffer with `capacity` bytes of storage.
    pub fn new(capacity: usize) -> Self {
        Self {
            storage: (0..capacity).map(|_| AtomicU8::new(0)).collect(),
            cursor: AtomicUsize::new(0),
            sealed_at: AtomicUsize::new(NOT_SEALED),
            sealed: AtomicBool::new(false),
            records: AtomicUsize::new(0),
            dropped: AtomicU64::new(0),
            epoch: AtomicU64::new(0),
            gate: AdmissionGate::new(true),
        }
    }

    /// Creates an open buffer sized by `cfg`.
    pub fn with_config(cfg: BufferConfig) -> Self {
        Self::new(cfg.capacity)
    }

    /// Total storage size in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// The gate guarding this buffer.
    #[inline]
    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    /// Returns true while appends are admitted.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.gate.is_enabled()
    }

    /// Returns true once an append overshot capacity in the current epoch.
    #[inline]
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Flag raised when the epoch seals; usable as a `sleep_until` condition.
    #[inline]
    pub fn sealed_flag(&self) -> &AtomicBool {
        &self.sealed
    }

    /// Current epoch number (incremented by every [`reset`](Self::reset)).
    #[inline]
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Appends refused since the last reset.
    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Records committed in the current epoch.
    #[inline]
    pub fn records(&self) -> usize {
        self.records.load(Ordering::Acquire)
    }

    /// Raw cursor value; may exceed capacity after an overflow.
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    /// End of the harvestable range `[0, valid_end)`.
    pub fn valid_end(&self) -> usize {
        self.cursor()
            .min(self.sealed_at.load(Ordering::Acquire))
            .min(self.capacity())
    }

    /// Closes the gate without waiting for in-flight appends.
    pub fn disable(&self) -> bool {
        self.gate.disable()
    }

    /// Appends one framed record holding `payload`.
    ///
    /// Returns `false` when the record was dropped: the gate is closed, the epoch
    /// is (or just became) full, or the payload can never fit this buffer.
    pub fn append(&self, payload: &[u8]) -> bool {
        let Some(_ticket) = self.gate.try_admit() else {
            return self.drop_record();
        };

        let need = payload.len() + OVERHEAD;
        if payload.len() > u32::MAX as usize || need > self.capacity() {
            debug!(len = payload.len(), capacity = self.capacity(), "record can never fit; dropped");
            return self.drop_record();
        }

        let begin = self.cursor.fetch_add(need, Ordering::AcqRel);
        let end = begin.saturating_add(need);
        if end > self.capacity() {
            self.seal(begin);
            return self.drop_record();
        }

        frame::write(&self.storage, begin, payload);
        self.records.fetch_add(1, Ordering::AcqRel);
        true
    }

    /// Appends `data[offset .. offset + length]`.
    ///
    /// An out-of-range slice is treated like any other refused append.
    pub fn append_range(&self, data: &[u8], offset: usize, length: usize) -> bool {
        match offset
            .checked_add(length)
            .and_then(|end| data.get(offset..end))
        {
            Some(payload) => self.append(payload),
            None => {
                warn!(offset, length, len = data.len(), "append range out of bounds");
                self.drop_record()
            }
        }
    }

    /// Copies the harvestable range, or `None` if the buffer is not quiesced.
    pub fn snapshot(&self) -> Option<Vec<u8>> {
        if !self.gate.is_disabled() {
            return None;
        }
        let end = self.valid_end();
        Some(
            self.storage[..end]
                .iter()
                .map(|b| b.load(Ordering::Acquire))
                .collect(),
        )
    }

    /// Starts a new epoch: cursor and counters back to zero, gate re-enabled.
    ///
    /// Returns the drop count of the closed epoch. The counter is swapped out
    /// last before the gate reopens, so every refusal lands in exactly one epoch.
    ///
    /// Call only after the gate drained (or on a buffer nobody appends to yet).
    pub fn reset(&self) -> u64 {
        self.cursor.store(0, Ordering::Release);
        self.sealed_at.store(NOT_SEALED, Ordering::Release);
        self.sealed.store(false, Ordering::Release);
        self.records.store(0, Ordering::Release);
        self.epoch.fetch_add(1, Ordering::AcqRel);
        let dropped = self.dropped.swap(0, Ordering::AcqRel);
        self.gate.enable();
        dropped
    }

    /// Drains the buffer and starts the next epoch.
    ///
    /// `disable → wait_drained → snapshot → reset`. The returned batch owns a copy
    /// of the harvested bytes, so producers resume before the batch is flushed.
    /// If the gate is re-enabled behind the harvester's back, the drain is repeated.
    pub async fn harvest(&self) -> Batch {
        let bytes = loop {
            self.gate.disable();
            self.gate.wait_drained().await;
            match self.snapshot() {
                Some(bytes) => break bytes,
                None => warn!(epoch = self.epoch(), "gate reopened during harvest; draining again"),
            }
        };

        let mut batch = Batch {
            epoch: self.epoch(),
            records: self.records(),
            dropped: 0,
            sealed: self.is_sealed(),
            bytes,
        };
        batch.dropped = self.reset();
        batch
    }

    /// Hands the harvestable range to `sink` without starting a new epoch.
    ///
    /// Returns `Ok(false)` (nothing sent) if the buffer is not quiesced.
    ///
    /// # Errors
    /// Propagates the sink's [`SinkError`].
    pub async fn send<S: Sink + ?Sized>(&self, sink: &S) -> Result<bool, SinkError> {
        let Some(bytes) = self.snapshot() else {
            debug!(sink = sink.name(), "send skipped; buffer not quiesced");
            return Ok(false);
        };
        let batch = Batch {
            epoch: self.epoch(),
            records: self.records(),
            dropped: self.dropped(),
            sealed: self.is_sealed(),
            bytes,
        };
        sink.flush(&batch).await?;
        Ok(true)
    }

    fn seal(&self, begin: usize) {
        self.sealed_at.fetch_min(begin, Ordering::AcqRel);
        self.sealed.store(true, Ordering::Release);
        if self.gate.disable() {
            debug!(
                epoch = self.epoch(),
                at = begin,
                capacity = self.capacity(),
                "append buffer full; epoch sealed"
            );
        }
    }

    #[inline]
    fn drop_record(&self) -> bool {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        false
    }
}

impl fmt::Debug for AppendBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppendBuffer")
            .field("capacity", &self.capacity())
            .field("cursor", &self.cursor())
            .field("epoch", &self.epoch())
            .field("sealed", &self.is_sealed())
            .field("gate", &self.gate)
            .finish()
    }
}
