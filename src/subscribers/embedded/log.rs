//! # LogWriter — event renderer over `tracing`
//!
//! A minimal subscriber that forwards incoming [`Event`]s to `tracing` macros.
//! Install any `tracing` subscriber (e.g. `tracing_subscriber::fmt`) to see them.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO quiesce: shutdown-requested remaining=2
//! INFO quiesce: worker-deregistered worker="harvester" remaining=1
//!  WARN quiesce: buffer-sealed epoch=3 dropped=17
//!  INFO quiesce: harvest-completed sink="file" epoch=3 records=940 bytes=65531 dropped=17
//!  WARN quiesce: flush-retry sink="file" epoch=4 attempt=1 delay_ms=100 err="io: broken pipe"
//! INFO quiesce: terminated
//! ```

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let source = e.source.as_deref().unwrap_or("unknown");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::ShutdownRequested => {
                info!(target: "quiesce", remaining = ?e.remaining, "shutdown-requested");
            }
            EventKind::Terminated => {
                info!(target: "quiesce", "terminated");
            }
            EventKind::GraceExceeded => {
                error!(target: "quiesce", remaining = ?e.remaining, grace_ms = ?e.delay_ms, "grace-exceeded");
            }
            EventKind::WorkerRegistered => {
                info!(target: "quiesce", worker = source, remaining = ?e.remaining, "worker-registered");
            }
            EventKind::WorkerDeregistered => {
                info!(target: "quiesce", worker = source, remaining = ?e.remaining, "worker-deregistered");
            }
            EventKind::BufferSealed => {
                warn!(target: "quiesce", epoch = ?e.epoch, dropped = ?e.dropped, "buffer-sealed");
            }
            EventKind::HarvestCompleted => {
                info!(
                    target: "quiesce",
                    sink = source,
                    epoch = ?e.epoch,
                    records = ?e.records,
                    bytes = ?e.bytes,
                    dropped = ?e.dropped,
                    "harvest-completed"
                );
            }
            EventKind::HarvestFailed => {
                error!(
                    target: "quiesce",
                    sink = source,
                    epoch = ?e.epoch,
                    records = ?e.records,
                    attempt = ?e.attempt,
                    err = reason,
                    "harvest-failed"
                );
            }
            EventKind::FlushRetryScheduled => {
                warn!(
                    target: "quiesce",
                    sink = source,
                    epoch = ?e.epoch,
                    attempt = ?e.attempt,
                    delay_ms = ?e.delay_ms,
                    err = reason,
                    "flush-retry"
                );
            }
            EventKind::SubscriberOverflow => {
                warn!(target: "quiesce", subscriber = source, reason, "subscriber-overflow");
            }
            EventKind::SubscriberPanicked => {
                error!(target: "quiesce", subscriber = source, info = reason, "subscriber-panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
