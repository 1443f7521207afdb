//! # Flush target for harvested buffers.
//!
//! Provides [`Sink`] the extension point that receives a drained [`Batch`]
//! (a transport, a file writer, a broker client). The buffer itself never
//! performs I/O.
//!
//! ## Rules
//! - `flush` is only ever called with a batch taken from a quiesced buffer.
//! - Retryable failures ([`SinkError::is_retryable`]) may be re-submitted with the same batch.
//! - A sink must not assume batches arrive from a single buffer.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use quiesce::{Batch, Sink, SinkError};
//!
//! struct Stdout;
//!
//! #[async_trait]
//! impl Sink for Stdout {
//!     async fn flush(&self, batch: &Batch) -> Result<(), SinkError> {
//!         println!("epoch={} records={} bytes={}", batch.epoch, batch.records, batch.bytes.len());
//!         Ok(())
//!     }
//!
//!     fn name(&self) -> &'static str { "stdout" }
//! }
//! ```

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::frame::Frames;
use crate::error::SinkError;

/// Bytes drained from one buffer epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Epoch of the buffer the bytes were taken from.
    pub epoch: u64,
    /// Number of records framed in `bytes`.
    pub records: usize,
    /// Appends refused during the epoch (disabled gate or overflow).
    pub dropped: u64,
    /// The epoch ended because an append overshot capacity.
    pub sealed: bool,
    /// Concatenated frames (see [`frame`](crate::frame)).
    pub bytes: Vec<u8>,
}

impl Batch {
    /// Returns true if the batch carries no records.
    pub fn is_empty(&self) -> bool {
        self.records == 0
    }

    /// Iterates the payloads in append order.
    pub fn frames(&self) -> Frames<'_> {
        Frames::new(&self.bytes)
    }
}

/// Destination for harvested batches.
#[async_trait]
pub trait Sink: Send + Sync + 'static {
    /// Persists or transmits one batch.
    async fn flush(&self, batch: &Batch) -> Result<(), SinkError>;

    /// Returns the sink name used in logs and events.
    ///
    /// The default uses `type_name::<Self>()`; override it with something short.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// In-memory sink that keeps every non-empty batch it receives.
///
/// Handy for tests and demos.
#[derive(Debug, Default)]
pub struct MemorySink {
    batches: Mutex<Vec<Batch>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all batches received so far.
    pub async fn batches(&self) -> Vec<Batch> {
        self.batches.lock().await.clone()
    }

    /// Returns every payload received so far, across batches, in order.
    pub async fn payloads(&self) -> Vec<Vec<u8>> {
        let batches = self.batches.lock().await;
        batches
            .iter()
            .flat_map(|b| b.frames().filter_map(Result::ok).map(<[u8]>::to_vec))
            .collect()
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn flush(&self, batch: &Batch) -> Result<(), SinkError> {
        if !batch.is_empty() {
            self.batches.lock().await.push(batch.clone());
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
