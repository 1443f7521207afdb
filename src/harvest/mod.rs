//! Periodic draining of append buffers into sinks.
//!
//! - [`Harvester`] registered worker running `disable → drain → snapshot → reset → flush`
//! - [`HarvestReport`] totals returned when the worker stops

mod harvester;

pub use harvester::{HarvestReport, Harvester};
