//! # Example: Harvest Pipeline
//!
//! Four producers append records to one buffer; a harvester drains it every
//! 500ms into a sink that fails now and then. Ctrl-C (or SIGTERM) stops the
//! producers, runs the final harvest and exits once everything deregistered.
//!
//! Run with: `cargo run --example harvest_pipeline --features logging`

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing_subscriber::EnvFilter;

use quiesce::{
    AppendBuffer, BackoffPolicy, Batch, BufferConfig, HarvestConfig, Harvester, JitterPolicy,
    Lifecycle, LifecycleConfig, LogWriter, Sink, SinkError, Subscribe,
};

/// Prints batch summaries; rejects every third flush.
#[derive(Default)]
struct ConsoleSink {
    flushes: AtomicU64,
}

#[async_trait]
impl Sink for ConsoleSink {
    async fn flush(&self, batch: &Batch) -> Result<(), SinkError> {
        let n = self.flushes.fetch_add(1, Ordering::Relaxed) + 1;
        if n % 3 == 0 {
            return Err(SinkError::Rejected {
                reason: format!("flush #{n} refused"),
            });
        }
        let first = batch
            .frames()
            .next()
            .and_then(Result::ok)
            .map(|p| String::from_utf8_lossy(p).into_owned());
        println!(
            "[sink] epoch={} records={} bytes={} dropped={} first={first:?}",
            batch.epoch,
            batch.records,
            batch.bytes.len(),
            batch.dropped
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "console"
    }
}

fn spawn_producer(lifecycle: &Arc<Lifecycle>, buffer: Arc<AppendBuffer>, id: usize) {
    let guard = lifecycle.register(format!("producer-{id}"));
    tokio::spawn(async move {
        let mut seq = 0u64;
        while guard.is_alive() {
            let record = format!("p{id}:{seq}");
            buffer.append(record.as_bytes());
            seq += 1;
            if guard.sleep(Duration::from_millis(5 + id as u64)).await {
                break;
            }
        }
        println!("[producer-{id}] stopped after {seq} records");
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let lc_cfg = LifecycleConfig {
        grace: Duration::from_secs(5),
        ..LifecycleConfig::default()
    };
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let lifecycle = Lifecycle::builder(lc_cfg).with_subscribers(subs).build();

    let buffer = Arc::new(AppendBuffer::with_config(BufferConfig { capacity: 4 * 1024 }));
    let harvest_cfg = HarvestConfig {
        interval: Duration::from_millis(500),
        slice: Duration::from_millis(20),
        max_flush_attempts: 4,
        backoff: BackoffPolicy {
            first: Duration::from_millis(50),
            max: Duration::from_millis(400),
            factor: 2.0,
            jitter: JitterPolicy::Full,
        },
    };
    let harvester = Harvester::new(
        "harvester",
        Arc::clone(&buffer),
        Arc::new(ConsoleSink::default()),
        harvest_cfg,
    )
    .spawn(&lifecycle);

    for id in 0..4 {
        spawn_producer(&lifecycle, Arc::clone(&buffer), id);
    }

    let Some(watcher) = lifecycle.install_signal_watcher() else {
        anyhow::bail!("signal watcher already installed");
    };
    println!("[main] running; press Ctrl-C to stop");

    watcher.await??;
    let report = harvester.await?;
    println!("[main] {report:?}");

    // Give the log subscriber a moment to print the last events.
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}
