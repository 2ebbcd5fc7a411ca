//! Stock message handlers.
//!
//! The typed handlers only simulate work by sleeping; real business logic is
//! plugged in by registering another [`MessageHandler`] for the same tag.

use futures::{future::BoxFuture, FutureExt};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::{
    decoder::DecodedMessage,
    dispatcher::MessageHandler,
    message_processor::ProcessingError,
};

/// Placeholder for a typed handler: logs the payload and sleeps for a fixed latency.
///
/// The simulated work is never cut short by shutdown.
#[derive(Debug, Clone)]
pub struct SimulatedWorkHandler {
    kind: &'static str,
    latency: Duration,
}

impl SimulatedWorkHandler {
    pub fn new(kind: &'static str, latency: Duration) -> Self {
        Self { kind, latency }
    }

    pub fn task() -> Self {
        Self::new("task", Duration::from_millis(500))
    }

    pub fn notification() -> Self {
        Self::new("notification", Duration::from_millis(200))
    }

    pub fn data_sync() -> Self {
        Self::new("data-sync", Duration::from_secs(1))
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }
}

impl MessageHandler for SimulatedWorkHandler {
    fn handle<'a>(
        &'a self,
        message: &'a DecodedMessage,
        token: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), ProcessingError>> {
        async move {
            if let DecodedMessage::Envelope(envelope) = message {
                tracing::info!(
                    kind = self.kind,
                    message_id = %envelope.id,
                    data = %envelope.data,
                    "handling message"
                );
            }
            if token.is_cancelled() {
                tracing::debug!(kind = self.kind, "shutdown requested, finishing message anyway");
            }
            tokio::time::sleep(self.latency).await;
            Ok(())
        }
        .boxed()
    }
}

/// Fallback for envelopes whose type tag has no handler. Logs and succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnknownTypeHandler;

impl MessageHandler for UnknownTypeHandler {
    fn handle<'a>(
        &'a self,
        message: &'a DecodedMessage,
        _token: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), ProcessingError>> {
        async move {
            tracing::warn!(
                message_type = message.message_type().unwrap_or_default(),
                message = ?message,
                "unknown message type"
            );
            Ok(())
        }
        .boxed()
    }
}

/// Handler for bodies that are not envelopes. Logs the text and succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawTextHandler;

impl MessageHandler for RawTextHandler {
    fn handle<'a>(
        &'a self,
        message: &'a DecodedMessage,
        _token: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), ProcessingError>> {
        async move {
            if let DecodedMessage::Raw(body) = message {
                tracing::info!(body = %body, "handling raw message");
            }
            Ok(())
        }
        .boxed()
    }
}
