//! Flush retry policies.
//!
//! ## Contents
//! - [`BackoffPolicy`] how long to wait between flush attempts (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization strategy so harvesters sharing a sink do not retry in lockstep
//!
//! ## Quick wiring
//! ```text
//! HarvestConfig { backoff: BackoffPolicy, max_flush_attempts, .. }
//!      └─► Harvester waits backoff.next(attempt) between flush attempts,
//!          sleeping through Lifecycle::sleep (cut short by shutdown)
//! ```
//!
//! ## Defaults
//! - `BackoffPolicy::default()` → first=100ms, factor=2.0, max=5s, jitter=Equal.

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
