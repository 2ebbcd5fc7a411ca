//! This module contains the configuration and implementation of the consumer loop

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::{
    decoder::{decode, DecodedMessage},
    message_processor::MessageProcessor,
    message_receiver::{MessageReceiver, QueueMessage, ReceiveRequest},
};

use std::{sync::Arc, time::Duration};

/// Configuration for the consumer loop
#[derive(Clone, Debug)]
pub struct ConsumerConfig {
    /// Maximum number of messages fetched per receive call
    ///
    /// Every message of a batch is processed concurrently.
    /// Default: 10
    pub max_messages: i32,
    /// Long-poll wait passed to each receive call
    /// Default: 20 seconds
    pub wait_time_seconds: i32,
    /// Visibility timeout requested for each received message
    ///
    /// A message that is not deleted before this elapses becomes visible to
    /// other consumers again.
    /// Default: 30 seconds
    pub visibility_timeout_seconds: i32,
    /// Delay after a failed receive call before polling again
    /// Default: 5 seconds
    pub receive_error_backoff: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            max_messages: 10,
            wait_time_seconds: 20,
            visibility_timeout_seconds: 30,
            receive_error_backoff: Duration::from_secs(5),
        }
    }
}

impl ConsumerConfig {
    pub fn receive_request(&self) -> ReceiveRequest {
        ReceiveRequest {
            max_messages: self.max_messages,
            wait_time_seconds: self.wait_time_seconds,
            visibility_timeout_seconds: self.visibility_timeout_seconds,
        }
    }
}

/// What happened to a single message of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Processed and deleted from the queue
    Deleted,
    /// Processed, but the delete request failed; the queue will redeliver it
    DeleteFailed,
    /// Processing failed; the message was left for redelivery
    ProcessingFailed,
}

/// Per-batch tally of message outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub deleted: usize,
    pub delete_failed: usize,
    pub processing_failed: usize,
}

impl BatchSummary {
    fn record(&mut self, outcome: MessageOutcome) {
        match outcome {
            MessageOutcome::Deleted => self.deleted += 1,
            MessageOutcome::DeleteFailed => self.delete_failed += 1,
            MessageOutcome::ProcessingFailed => self.processing_failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.deleted + self.delete_failed + self.processing_failed
    }
}

/// Polls a queue, processes each batch concurrently and deletes what succeeded.
///
/// Every batch is fanned out to one task per message and the consumer waits
/// for all of them before it polls again, so batches never overlap.
///
/// # Type Parameters
///
/// * `R` - The queue client, implementing [`MessageReceiver`]
/// * `P` - The processor, implementing [`MessageProcessor`] over [`DecodedMessage`]
pub struct Consumer<R, P> {
    receiver: Arc<R>,
    processor: Arc<P>,
    config: ConsumerConfig,
}

impl<R, P> Consumer<R, P> {
    /// Create a new consumer with the given receiver, processor, and configuration
    pub fn new(receiver: R, processor: P, config: ConsumerConfig) -> Self {
        Self {
            receiver: Arc::new(receiver),
            processor: Arc::new(processor),
            config,
        }
    }

    /// Create a new consumer with default configuration
    pub fn with_defaults(receiver: R, processor: P) -> Self {
        Self::new(receiver, processor, ConsumerConfig::default())
    }

    /// Set the batch size (builder pattern)
    pub fn with_max_messages(mut self, max_messages: i32) -> Self {
        self.config.max_messages = max_messages;
        self
    }

    /// Set the long-poll wait (builder pattern)
    pub fn with_wait_time_seconds(mut self, seconds: i32) -> Self {
        self.config.wait_time_seconds = seconds;
        self
    }

    /// Set the visibility timeout (builder pattern)
    pub fn with_visibility_timeout_seconds(mut self, seconds: i32) -> Self {
        self.config.visibility_timeout_seconds = seconds;
        self
    }

    /// Set the delay after a failed receive (builder pattern)
    pub fn with_receive_error_backoff(mut self, backoff: Duration) -> Self {
        self.config.receive_error_backoff = backoff;
        self
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    /// Run the poll loop until `token` is cancelled.
    ///
    /// Cancellation is observed between batches and while waiting on a receive
    /// or a backoff. A batch that has already been dispatched always runs to
    /// completion before this returns; its processors get a clone of `token`
    /// and may watch it, but are never aborted.
    pub async fn run(&self, token: CancellationToken) -> anyhow::Result<()>
    where
        R: MessageReceiver + Send + Sync + 'static,
        P: MessageProcessor<DecodedMessage> + Send + Sync + 'static,
    {
        let request = self.config.receive_request();

        tracing::info!(
            max_messages = request.max_messages,
            wait_time_seconds = request.wait_time_seconds,
            visibility_timeout_seconds = request.visibility_timeout_seconds,
            "starting consumer loop"
        );

        loop {
            if token.is_cancelled() {
                break;
            }

            let received = tokio::select! {
                _ = token.cancelled() => break,
                received = self.receiver.receive_messages(&request) => received,
            };

            let messages = match received {
                Ok(messages) => messages,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        backoff_secs = self.config.receive_error_backoff.as_secs_f64(),
                        "failed to receive messages"
                    );
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = tokio::time::sleep(self.config.receive_error_backoff) => {}
                    }
                    continue;
                }
            };

            if messages.is_empty() {
                tracing::debug!("no messages received");
                continue;
            }

            let message_count = messages.len();
            tracing::info!(message_count, "received messages");

            let summary = self.process_batch(messages, &token).await;

            tracing::info!(
                message_count,
                deleted = summary.deleted,
                delete_failed = summary.delete_failed,
                processing_failed = summary.processing_failed,
                "batch complete"
            );
        }

        tracing::info!("cancellation requested, consumer loop stopped");
        Ok(())
    }

    /// Process every message of a batch concurrently and wait for all of them.
    ///
    /// Each message task gets its own clone of `token`.
    pub async fn process_batch(
        &self,
        messages: Vec<QueueMessage>,
        token: &CancellationToken,
    ) -> BatchSummary
    where
        R: MessageReceiver + Send + Sync + 'static,
        P: MessageProcessor<DecodedMessage> + Send + Sync + 'static,
    {
        let mut tasks = JoinSet::new();

        for message in messages {
            tasks.spawn(handle_message(
                Arc::clone(&self.receiver),
                Arc::clone(&self.processor),
                message,
                token.clone(),
            ));
        }

        let mut summary = BatchSummary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => summary.record(outcome),
                Err(e) => {
                    tracing::error!(error = %e, "message task panicked");
                    summary.record(MessageOutcome::ProcessingFailed);
                }
            }
        }

        summary
    }
}

/// Decode, process and, on success, delete a single message
#[tracing::instrument(skip_all, fields(message_id = %message.message_id))]
async fn handle_message<R, P>(
    receiver: Arc<R>,
    processor: Arc<P>,
    message: QueueMessage,
    token: CancellationToken,
) -> MessageOutcome
where
    R: MessageReceiver + Send + Sync + 'static,
    P: MessageProcessor<DecodedMessage> + Send + Sync + 'static,
{
    let decoded = decode(&message.body);
    let message_type = decoded.message_type();

    tracing::info!(message_type, "processing message");

    if let Err(e) = processor.process_message(&decoded, &token).await {
        tracing::error!(message_type, error = %e, "message processing failed");
        return MessageOutcome::ProcessingFailed;
    }

    tracing::info!(message_type, "message processed");

    match receiver.delete_message(&message.receipt_handle).await {
        Ok(()) => {
            tracing::debug!("message deleted");
            MessageOutcome::Deleted
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to delete message");
            MessageOutcome::DeleteFailed
        }
    }
}
