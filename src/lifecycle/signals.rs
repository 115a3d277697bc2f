//! OS signal handling.
//!
//! # Responsibilities
//! - SIGINT/SIGTERM → trigger graceful shutdown
//! - SIGHUP → reload configuration from disk
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGHUP triggers config reload, not shutdown

use crate::config::watcher::ReloadHandle;
use crate::lifecycle::{Shutdown, ShutdownSignal};

/// Resolve when the process is asked to stop.
pub async fn terminate_requested() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Wait for a termination signal, then trigger `shutdown`.
pub async fn shutdown_on_signal(shutdown: Shutdown) {
    terminate_requested().await;
    tracing::info!("Shutdown signal received");
    shutdown.trigger();
}

/// Reload configuration on every SIGHUP until shutdown.
#[cfg(unix)]
pub async fn reload_on_hangup(reload: ReloadHandle, mut shutdown: ShutdownSignal) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install SIGHUP handler");
            return;
        }
    };

    loop {
        tokio::select! {
            received = hangup.recv() => {
                if received.is_none() {
                    break;
                }
                tracing::info!("SIGHUP received, reloading configuration");
                reload.reload();
            }
            _ = shutdown.recv() => break,
        }
    }
}

#[cfg(not(unix))]
pub async fn reload_on_hangup(_reload: ReloadHandle, mut shutdown: ShutdownSignal) {
    shutdown.recv().await;
}
