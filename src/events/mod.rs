//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the lifecycle, harvesters and
//! subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Lifecycle` (shutdown/termination/registration), `Harvester`
//!   (seal/flush outcomes), `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: `SubscriberSet::listen()`, which fans out to user subscribers.
//!
//! Nothing on the append fast path publishes; buffer events come from the harvester.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
