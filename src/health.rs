//! Liveness endpoint. Every request is answered with `200 OK`.

use anyhow::Context;
use axum::{http::StatusCode, Router};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

async fn alive() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

pub fn router() -> Router {
    Router::new().fallback(alive)
}

/// Serve the liveness endpoint on `addr` until `token` is cancelled.
pub async fn serve(addr: SocketAddr, token: CancellationToken) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind health check server to {addr}"))?;

    tracing::info!(%addr, "health check server listening");

    axum::serve(listener, router())
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await
        .context("health check server failed")?;

    tracing::info!("health check server stopped");
    Ok(())
}
