//! # Periodic harvester: drains an [`AppendBuffer`] into a [`Sink`].
//!
//! The harvester is a registered lifecycle worker. It sleeps for `interval`,
//! waking early when the buffer seals, and drains the buffer each time it wakes.
//! On shutdown it runs one final harvest before deregistering, so records
//! appended before the stop are not lost.
//!
//! ## Cycle
//! ```text
//! sleep_until(interval, slice, [sealed]) ──► Stopped ──► final cycle ──► guard drops
//!        │ Timeout / Condition(1)
//!        ▼
//! buffer.harvest()  (disable → drain → snapshot → reset)
//!        │ empty? ──► next sleep
//!        ▼
//! sink.flush(batch) ── ok ──► HarvestCompleted
//!        │ retryable err, attempts left, still running
//!        ├──► FlushRetryScheduled ──► sleep(backoff.next(n)) ──► flush again
//!        │ otherwise
//!        └──► HarvestFailed (batch discarded)
//! ```
//!
//! ## Rules
//! - Producers resume as soon as the buffer is reset; flushing works on a copy.
//! - Once shutdown is requested a failing flush gets one more attempt, no more.
//! - `max_flush_attempts = 0` retries retryable failures until shutdown.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::buffer::{AppendBuffer, Batch, Sink};
use crate::config::HarvestConfig;
use crate::error::SinkError;
use crate::events::{Event, EventKind};
use crate::lifecycle::{Lifecycle, Wake, WorkerGuard};

/// Totals accumulated by one harvester run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestReport {
    /// Drain cycles performed, the final one included.
    pub harvests: u64,
    /// Cycles triggered early by a sealed buffer.
    pub early_harvests: u64,
    /// Epochs that ended sealed.
    pub sealed_epochs: u64,
    /// Batches the sink accepted.
    pub flushed_batches: u64,
    /// Records in accepted batches.
    pub flushed_records: u64,
    /// Batches discarded after failed flushes.
    pub failed_batches: u64,
    /// Records in discarded batches.
    pub lost_records: u64,
    /// Appends refused by the buffer across all epochs.
    pub dropped: u64,
    /// Flush retries scheduled.
    pub retries: u64,
}

/// Drains one buffer into one sink until the lifecycle stops.
pub struct Harvester {
    name: Arc<str>,
    buffer: Arc<AppendBuffer>,
    sink: Arc<dyn Sink>,
    cfg: HarvestConfig,
}

impl Harvester {
    /// Creates a harvester; nothing runs until [`spawn`](Self::spawn) or [`run`](Self::run).
    pub fn new(
        name: impl Into<Arc<str>>,
        buffer: Arc<AppendBuffer>,
        sink: Arc<dyn Sink>,
        cfg: HarvestConfig,
    ) -> Self {
        Self {
            name: name.into(),
            buffer,
            sink,
            cfg,
        }
    }

    /// Worker name used for registration.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers with `lifecycle` and runs on a new task.
    ///
    /// Registration happens before spawning, so a shutdown requested right after
    /// this call still waits for the final harvest.
    pub fn spawn(self, lifecycle: &Arc<Lifecycle>) -> JoinHandle<HarvestReport> {
        let guard = lifecycle.register(Arc::clone(&self.name));
        tokio::spawn(self.run(guard))
    }

    /// Runs the harvest loop; `guard` is released after the final harvest.
    pub async fn run(self, guard: WorkerGuard) -> HarvestReport {
        let lifecycle = Arc::clone(guard.lifecycle());
        let slice = self.cfg.slice_clamped();
        let mut report = HarvestReport::default();
        debug!(worker = %self.name, sink = self.sink.name(), "harvester started");

        loop {
            let sealed = self.buffer.sealed_flag();
            match guard.sleep_until(self.cfg.interval, slice, &[sealed]).await {
                Wake::Stopped => break,
                Wake::Condition(_) => report.early_harvests += 1,
                Wake::Timeout => {}
            }
            self.cycle(&lifecycle, &mut report).await;
        }

        self.cycle(&lifecycle, &mut report).await;
        info!(
            worker = %self.name,
            harvests = report.harvests,
            flushed = report.flushed_records,
            lost = report.lost_records,
            dropped = report.dropped,
            "harvester finished"
        );
        drop(guard);
        report
    }

    async fn cycle(&self, lifecycle: &Lifecycle, report: &mut HarvestReport) {
        let batch = self.buffer.harvest().await;
        report.harvests += 1;
        report.dropped += batch.dropped;

        let bus = lifecycle.bus();
        if batch.sealed {
            report.sealed_epochs += 1;
            bus.publish(
                Event::new(EventKind::BufferSealed)
                    .with_source(Arc::clone(&self.name))
                    .with_epoch(batch.epoch)
                    .with_dropped(batch.dropped),
            );
        }
        if batch.is_empty() {
            return;
        }

        match self.flush(lifecycle, &batch, report).await {
            Ok(attempts) => {
                report.flushed_batches += 1;
                report.flushed_records += batch.records as u64;
                bus.publish(
                    Event::new(EventKind::HarvestCompleted)
                        .with_source(self.sink.name())
                        .with_epoch(batch.epoch)
                        .with_batch(batch.records, batch.bytes.len())
                        .with_dropped(batch.dropped)
                        .with_attempt(attempts),
                );
            }
            Err((err, attempts)) => {
                report.failed_batches += 1;
                report.lost_records += batch.records as u64;
                warn!(
                    sink = self.sink.name(),
                    epoch = batch.epoch,
                    records = batch.records,
                    attempts,
                    error = %err,
                    "batch discarded"
                );
                bus.publish(
                    Event::new(EventKind::HarvestFailed)
                        .with_source(self.sink.name())
                        .with_epoch(batch.epoch)
                        .with_batch(batch.records, batch.bytes.len())
                        .with_attempt(attempts)
                        .with_reason(err.as_message()),
                );
            }
        }
    }

    /// Flushes `batch`, retrying per config. Returns the attempts made.
    async fn flush(
        &self,
        lifecycle: &Lifecycle,
        batch: &Batch,
        report: &mut HarvestReport,
    ) -> Result<u32, (SinkError, u32)> {
        let limit = self.cfg.attempt_limit();
        let mut attempt: u32 = 0;

        loop {
            attempt = attempt.saturating_add(1);
            let err = match self.sink.flush(batch).await {
                Ok(()) => return Ok(attempt),
                Err(err) => err,
            };

            let exhausted = limit.is_some_and(|max| attempt >= max);
            if !err.is_retryable() || exhausted || !lifecycle.is_alive() {
                return Err((err, attempt));
            }

            let delay = self.cfg.backoff.next(attempt - 1);
            report.retries += 1;
            debug!(sink = self.sink.name(), attempt, ?delay, error = %err, "flush failed; retrying");
            lifecycle.bus().publish(
                Event::new(EventKind::FlushRetryScheduled)
                    .with_source(self.sink.name())
                    .with_epoch(batch.epoch)
                    .with_attempt(attempt)
                    .with_delay(delay)
                    .with_reason(err.as_message()),
            );
            lifecycle.sleep(delay).await;
        }
    }
}
