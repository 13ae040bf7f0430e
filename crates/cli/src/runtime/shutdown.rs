//! Ctrl+C / SIGTERM handling

use tokio::sync::watch;
use tracing::{error, warn};

/// Resolve on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed is logged and never fires.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
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
}

/// Flag raised once by the first shutdown signal
pub fn shutdown_flag() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Received shutdown signal, stopping...");
        tx.send_replace(true);
        // Keep the flag readable for late subscribers
        tx.closed().await;
    });
    rx
}

/// Resolve once `flag` is raised; never resolves if its sender is gone
pub async fn wait_for_flag(mut flag: watch::Receiver<bool>) {
    if flag.wait_for(|raised| *raised).await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_for_flag_resolves_when_raised() {
        let (tx, rx) = watch::channel(false);
        let waiter = tokio::spawn(wait_for_flag(rx));
        tx.send_replace(true);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_flag_pends_without_sender() {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        let result = tokio::time::timeout(Duration::from_millis(50), wait_for_flag(rx)).await;
        assert!(result.is_err());
    }
}
