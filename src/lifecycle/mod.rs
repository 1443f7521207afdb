//! Lifecycle controller.
//!
//! Owns the alive/terminated state, the sticky stop signal and the count of
//! registered workers, and offers sleeps that end early on shutdown.
//!
//! - [`Lifecycle`] state machine, registration, termination waits
//! - [`WorkerGuard`] scoped registration
//! - [`Wake`] outcome of a conditional sleep
//! - [`LifecycleBuilder`] attaches event subscribers

mod builder;
mod controller;
mod guard;
mod signals;
mod sleep;
mod watcher;

pub use builder::LifecycleBuilder;
pub use controller::{Lifecycle, LifecycleState};
pub use guard::WorkerGuard;
pub use signals::termination_signal;
pub use sleep::Wake;
