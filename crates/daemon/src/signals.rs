//! Shutdown signal handling.
//!
//! The daemon parks on [`wait_for_shutdown`] after spawning the web server;
//! SIGTERM (Unix) or Ctrl+C unparks it and the update engine is torn down.
//! In-flight update attempts hold no cross-process state, so teardown needs
//! no draining beyond aborting the server task.

use tracing::info;

/// Resolve once a termination signal (SIGTERM or Ctrl+C) arrives.
pub async fn wait_for_shutdown() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("received SIGTERM");
        }
    }
}
