//! Turns OS termination signals into cancellation of the process-wide token.

use futures::Future;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Cancel `token` on ctrl-c (SIGINT) and, on Unix, on SIGTERM.
///
/// The listener runs as a background task. It also finishes, without doing
/// anything, once the token is cancelled by someone else.
pub fn cancel_on_shutdown_signal(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(cancel_on(token, shutdown_signal()))
}

/// Cancel `token` once `signal` resolves, or return as soon as the token is
/// cancelled elsewhere.
async fn cancel_on(token: CancellationToken, signal: impl Future<Output = &'static str>) {
    tokio::select! {
        name = signal => {
            tracing::info!(signal = name, "received shutdown signal");
            token.cancel();
        }
        _ = token.cancelled() => {}
    }
}

/// Resolves with the name of the first termination signal received. A signal
/// whose handler cannot be installed is logged and never fires.
async fn shutdown_signal() -> &'static str {
    let interrupt = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "SIGINT",
            Err(e) => {
                tracing::error!(error = %e, "error setting up SIGINT handler");
                futures::future::pending().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                "SIGTERM"
            }
            Err(e) => {
                tracing::error!(error = %e, "error setting up SIGTERM handler");
                futures::future::pending().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = futures::future::pending::<&'static str>();

    tokio::select! {
        name = interrupt => name,
        name = terminate => name,
    }
}
