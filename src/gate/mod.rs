//! Admission control: the quiesce primitive every other component builds on.
//!
//! ## Contents
//! - [`AdmissionGate`] enabled/disabled toggle plus in-flight counter
//! - [`Admission`] scoped ticket returned by [`AdmissionGate::try_admit`]; leaves on drop
//!
//! ## Drain protocol
//! ```text
//! harvester                      producers
//!   disable() ──────────────┐      enter() ─► work ─► leave()
//!   wait_drained().await    │      enter() ─► false  (after disable observed)
//!        ▲                  │
//!        └── woken when enabled == false && in_flight == 0
//! ```

mod admission;

pub use admission::{Admission, AdmissionGate};
