//! # Scoped worker registration.
//!
//! A [`WorkerGuard`] keeps its worker counted as registered; dropping it (normal
//! return, early `?`, panic unwind, task abort) deregisters exactly once.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::controller::Lifecycle;
use super::sleep::Wake;

/// Registration handle returned by [`Lifecycle::register`].
#[must_use = "dropping the guard deregisters the worker immediately"]
pub struct WorkerGuard {
    lifecycle: Arc<Lifecycle>,
    name: Arc<str>,
}

impl WorkerGuard {
    pub(super) fn new(lifecycle: Arc<Lifecycle>, name: Arc<str>) -> Self {
        Self { lifecycle, name }
    }

    /// Worker name given at registration.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lifecycle this worker is registered with.
    pub fn lifecycle(&self) -> &Arc<Lifecycle> {
        &self.lifecycle
    }

    /// Shorthand for [`Lifecycle::is_alive`].
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.lifecycle.is_alive()
    }

    /// Shorthand for [`Lifecycle::sleep`].
    pub async fn sleep(&self, duration: Duration) -> bool {
        self.lifecycle.sleep(duration).await
    }

    /// Shorthand for [`Lifecycle::sleep_until`].
    pub async fn sleep_until(
        &self,
        total: Duration,
        slice: Duration,
        conditions: &[&std::sync::atomic::AtomicBool],
    ) -> Wake {
        self.lifecycle.sleep_until(total, slice, conditions).await
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.lifecycle.deregister(&self.name);
    }
}

impl fmt::Debug for WorkerGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerGuard").field("name", &self.name).finish()
    }
}
