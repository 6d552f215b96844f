//! # OS termination signals.
//!
//! [`wait_for_shutdown_signal`] completes when the process receives a
//! termination signal; [`interrupted`] wraps it for the executor's driving
//! loop, turning "disabled" and "registration failed" into a future that
//! never completes.
//!
//! **Unix:** `SIGINT`, `SIGTERM`, `SIGQUIT` (plus `ctrl_c`).
//! **Other platforms:** `Ctrl-C` via [`tokio::signal::ctrl_c`].

use tracing::warn;

/// Waits for a termination signal. Each call registers its own listeners.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Waits for a termination signal. Each call registers its own listeners.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Completes on a termination signal; pends forever when `enabled` is false
/// or the listeners cannot be installed.
pub(crate) async fn interrupted(enabled: bool) {
    if enabled {
        match wait_for_shutdown_signal().await {
            Ok(()) => return,
            Err(err) => warn!(error = %err, "signal handlers unavailable; running without them"),
        }
    }
    std::future::pending::<()>().await
}
