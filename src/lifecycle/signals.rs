//! OS signal handling.
//!
//! SIGTERM and SIGINT request shutdown. SIGHUP requests a config reload.

use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEvent {
    Shutdown,
    Reload,
}

/// Wait for the next signal we act on.
#[cfg(unix)]
pub async fn wait_for_signal() -> io::Result<SignalEvent> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    let mut hangup = signal(SignalKind::hangup())?;

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res?;
            tracing::info!("SIGINT received");
            Ok(SignalEvent::Shutdown)
        }
        _ = terminate.recv() => {
            tracing::info!("SIGTERM received");
            Ok(SignalEvent::Shutdown)
        }
        _ = hangup.recv() => {
            tracing::info!("SIGHUP received");
            Ok(SignalEvent::Reload)
        }
    }
}

#[cfg(not(unix))]
pub async fn wait_for_signal() -> io::Result<SignalEvent> {
    tokio::signal::ctrl_c().await?;
    tracing::info!("Ctrl-C received");
    Ok(SignalEvent::Shutdown)
}
