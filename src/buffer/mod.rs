//! Lock-free append buffer and its flush boundary.
//!
//! ## Contents
//! - [`AppendBuffer`] bump-allocated, gate-guarded record store
//! - [`frame`] record layout and the [`Frames`](frame::Frames) decoder
//! - [`Sink`] / [`Batch`] hand-off to external transports; [`MemorySink`] for tests
//!
//! ## Quick wiring
//! ```text
//! producers ── append() ──► AppendBuffer ◄── harvest() ── Harvester ── flush(Batch) ──► Sink
//! ```

mod append;
pub mod frame;
mod sink;

pub use append::AppendBuffer;
pub use sink::{Batch, MemorySink, Sink};
