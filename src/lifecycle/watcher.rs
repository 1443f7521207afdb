//! # Shutdown watcher.
//!
//! One background task per lifecycle that turns an external trigger (normally a
//! termination signal) into [`Lifecycle::shutdown`] and then holds until the
//! lifecycle terminates, bounded by the configured grace.
//!
//! ```text
//! trigger fires ──► shutdown() ──► wait_terminated_within(grace) ──► Ok / GraceExceeded
//! shutdown() elsewhere ──────────┘
//! ```
//!
//! The process should await the returned handle before exiting so that workers
//! finish their final harvest.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use tokio::task::JoinHandle;
use tracing::warn;

use super::controller::Lifecycle;
use super::signals::termination_signal;
use crate::error::RuntimeError;

impl Lifecycle {
    /// Installs the watcher driven by process termination signals.
    ///
    /// Returns `None` if a watcher is already installed on this lifecycle.
    pub fn install_signal_watcher(
        self: &Arc<Self>,
    ) -> Option<JoinHandle<Result<(), RuntimeError>>> {
        self.install_watcher(termination_signal())
    }

    /// Installs the watcher driven by an arbitrary `trigger` future.
    ///
    /// The trigger resolving to `Ok(())` requests shutdown; an error is returned
    /// from the task without touching the lifecycle. Shutdown requested by other
    /// means also ends the wait for the trigger.
    ///
    /// Returns `None` if a watcher is already installed on this lifecycle.
    pub fn install_watcher<F>(
        self: &Arc<Self>,
        trigger: F,
    ) -> Option<JoinHandle<Result<(), RuntimeError>>>
    where
        F: Future<Output = std::io::Result<()>> + Send + 'static,
    {
        if self.watcher_installed.swap(true, Ordering::SeqCst) {
            warn!("shutdown watcher already installed");
            return None;
        }

        let lc = Arc::clone(self);
        Some(tokio::spawn(async move {
            tokio::select! {
                fired = trigger => {
                    fired?;
                    lc.shutdown();
                }
                _ = lc.stopped() => {}
            }
            lc.wait_terminated_within(lc.cfg.grace_limit()).await
        }))
    }
}
