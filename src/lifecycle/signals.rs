//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT, SIGHUP)
//! - Translate signals to internal events
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGHUP triggers a remount, not shutdown
//! - Non-unix targets only get Ctrl+C

use tokio::sync::mpsc;

use crate::lifecycle::shutdown::Shutdown;

/// Internal event raised by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEvent {
    Shutdown,
    Remount,
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

/// Spawn the signal listener. Shutdown signals trigger `shutdown`; SIGHUP
/// sends [`SignalEvent::Remount`] on the returned channel.
pub fn spawn_signal_listener(shutdown: Shutdown) -> mpsc::UnboundedReceiver<SignalEvent> {
    let (tx, rx) = mpsc::unbounded_channel();

    #[cfg(unix)]
    {
        let tx = tx.clone();
        let mut stop = shutdown.subscribe();
        tokio::spawn(async move {
            use tokio::signal::unix::{signal, SignalKind};
            let mut hangup = match signal(SignalKind::hangup()) {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGHUP handler");
                    return;
                }
            };
            loop {
                tokio::select! {
                    _ = hangup.recv() => {
                        tracing::info!("SIGHUP received, remounting routes");
                        if tx.send(SignalEvent::Remount).is_err() {
                            return;
                        }
                    }
                    _ = stop.recv() => return,
                }
            }
        });
    }

    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = tx.send(SignalEvent::Shutdown);
        shutdown.trigger();
    });

    rx
}
