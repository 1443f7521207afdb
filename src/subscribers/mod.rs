//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and
//! built-in implementations for handling events broadcast through the
//! [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Lifecycle / Harvester ── publish(Event) ──► Bus ──► SubscriberSet::listen()
//!                                                          │
//!                                               ┌──────────┼──────────┐
//!                                               ▼          ▼          ▼
//!                                           LogWriter   Metrics    Custom
//! ```

mod subscriber;
mod subscriber_set;

#[cfg(feature = "logging")]
mod embedded;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use subscriber::Subscribe;
pub use subscriber_set::SubscriberSet;
