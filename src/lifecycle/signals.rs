//! # Process termination signals.
//!
//! **Unix:** `SIGINT`, `SIGTERM`, `SIGQUIT`.
//! **Other platforms:** Ctrl-C only.

/// Completes when the process receives a termination signal.
///
/// Listeners are registered per call.
///
/// # Errors
/// Returns the I/O error if a signal handler cannot be installed.
#[cfg(unix)]
pub async fn termination_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;

    let name = tokio::select! {
        _ = interrupt.recv() => "SIGINT",
        _ = terminate.recv() => "SIGTERM",
        _ = quit.recv() => "SIGQUIT",
    };
    tracing::info!(signal = name, "termination signal received");
    Ok(())
}

/// Completes when the process receives a termination signal.
///
/// # Errors
/// Returns the I/O error if the Ctrl-C handler cannot be installed.
#[cfg(not(unix))]
pub async fn termination_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::info!(signal = "ctrl-c", "termination signal received");
    Ok(())
}
