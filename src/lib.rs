//! # quiesce
//!
//! **Quiesce** provides lock-free admission control for shared buffers and a
//! cooperative lifecycle for the workers that drain them.
//!
//! Producers append records without locks or blocking. A harvester closes the
//! buffer, waits until in-flight appends have finished ("quiesced"), copies the
//! committed bytes out, reopens the buffer and hands the copy to a sink. The
//! lifecycle coordinates shutdown: it wakes every sleeper at once, waits for
//! registered workers to finish, and reports when the process may exit.
//!
//! ## Architecture
//! ```text
//!   producer   producer   producer
//!      │ append   │          │
//!      ▼          ▼          ▼
//! ┌─────────────────────────────────────────────┐
//! │ AppendBuffer                                │
//! │  AdmissionGate (enabled + in_flight)        │
//! │  cursor.fetch_add ─► [len|payload|status].. │
//! └──────────────────────┬──────────────────────┘
//!          sealed flag / │ harvest(): disable → wait_drained → snapshot → reset
//!          interval      ▼
//! ┌─────────────────────────────────────────────┐      ┌──────────────┐
//! │ Harvester (registered worker)               │─────►│ Sink::flush  │
//! │  sleep_until(interval, slice, [sealed])     │      └──────────────┘
//! │  retry with BackoffPolicy                   │
//! └──────────────────────┬──────────────────────┘
//!                        │ WorkerGuard
//!                        ▼
//! ┌─────────────────────────────────────────────┐
//! │ Lifecycle                                   │
//! │  alive / terminated, registered count       │
//! │  sticky stop signal (wakes every sleeper)   │
//! │  signal watcher ─► shutdown() ─► grace wait │
//! └──────────────────────┬──────────────────────┘
//!                        │ publish(Event)
//!                        ▼
//!                  Bus ─► SubscriberSet ─► LogWriter / custom subscribers
//! ```
//!
//! ### Shutdown
//! ```text
//! SIGTERM ─► watcher ─► shutdown()
//!                        ├─► alive = false, stop signal tripped
//!                        │     └─► every sleep()/sleep_until() returns at once
//!                        └─► registered == 0 ? Terminated : Stopping
//! Harvester: Wake::Stopped ─► final harvest ─► guard dropped ─► last one ─► Terminated
//! watcher: wait_terminated_within(grace) ─► Ok | GraceExceeded
//! ```
//!
//! ## Features
//! | Area            | Description                                              | Key types                                 |
//! |-----------------|----------------------------------------------------------|-------------------------------------------|
//! | **Admission**   | Enter/leave counter with a disable-and-drain protocol.   | [`AdmissionGate`], [`Admission`]          |
//! | **Buffer**      | Bump-allocated framed records, epoch sealing on overflow.| [`AppendBuffer`], [`frame`], [`Batch`]    |
//! | **Lifecycle**   | Shutdown latch, worker registration, interruptible sleep.| [`Lifecycle`], [`WorkerGuard`], [`Wake`]  |
//! | **Harvesting**  | Periodic drain into a sink with retries.                 | [`Harvester`], [`Sink`], [`HarvestReport`]|
//! | **Events**      | Broadcast runtime events to subscribers.                 | [`Event`], [`Bus`], [`Subscribe`]         |
//! | **Errors**      | Typed errors for gate, frames, sinks and the runtime.    | [`GateError`], [`SinkError`], [`RuntimeError`] |
//!
//! ## Optional features
//! - `logging`: exports a built-in [`LogWriter`] subscriber rendering events through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use quiesce::{AppendBuffer, HarvestConfig, Harvester, Lifecycle, LifecycleConfig, MemorySink};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let lifecycle = Lifecycle::new(LifecycleConfig::default());
//!     let buffer = Arc::new(AppendBuffer::new(4096));
//!     let sink = Arc::new(MemorySink::new());
//!
//!     let harvester = Harvester::new("harvester", Arc::clone(&buffer), sink.clone(), HarvestConfig::default())
//!         .spawn(&lifecycle);
//!
//!     for i in 0..10u32 {
//!         buffer.append(&i.to_be_bytes());
//!     }
//!
//!     // The harvester drains what is left before it deregisters.
//!     lifecycle.shutdown();
//!     lifecycle.wait_terminated_within(Some(Duration::from_secs(5))).await?;
//!
//!     let report = harvester.await?;
//!     assert_eq!(report.flushed_records, 10);
//!     assert_eq!(sink.payloads().await.len(), 10);
//!     Ok(())
//! }
//! ```
mod buffer;
mod config;
mod error;
mod events;
mod gate;
mod harvest;
mod lifecycle;
mod policies;
mod subscribers;

// ---- Public re-exports ----

pub use buffer::frame;
pub use buffer::{AppendBuffer, Batch, MemorySink, Sink};
pub use config::{BufferConfig, HarvestConfig, LifecycleConfig};
pub use error::{FrameError, GateError, RuntimeError, SinkError};
pub use events::{Bus, Event, EventKind};
pub use gate::{Admission, AdmissionGate};
pub use harvest::{HarvestReport, Harvester};
pub use lifecycle::{
    Lifecycle, LifecycleBuilder, LifecycleState, Wake, WorkerGuard, termination_signal,
};
pub use policies::{BackoffPolicy, JitterPolicy};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
