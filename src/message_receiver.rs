//! This module provides the trait used to receive and delete messages from the source queue.

use futures::Future;
use std::collections::HashMap;

/// A single delivery received from the queue.
///
/// The receipt handle identifies this particular delivery and is the only thing
/// needed to delete it again; the message id identifies the message across
/// redeliveries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Queue-assigned message identifier
    pub message_id: String,
    /// Raw UTF-8 message body
    pub body: String,
    /// Opaque token required to delete this delivery
    pub receipt_handle: String,
    /// Delivery and message attributes returned alongside the body
    pub attributes: HashMap<String, String>,
}

impl QueueMessage {
    /// Create a message with no attributes
    pub fn new(
        message_id: impl Into<String>,
        body: impl Into<String>,
        receipt_handle: impl Into<String>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            body: body.into(),
            receipt_handle: receipt_handle.into(),
            attributes: HashMap::new(),
        }
    }
}

/// Parameters passed on every receive call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveRequest {
    /// Upper bound on the number of messages returned
    pub max_messages: i32,
    /// Long-poll wait; the call may block this long before returning empty
    pub wait_time_seconds: i32,
    /// Queue-side lease on every returned message
    pub visibility_timeout_seconds: i32,
}

/// A trait for the queue client used by the [`Consumer`](crate::Consumer).
///
/// Implementations are thin translations onto a queue's wire API. Retries,
/// backoff and cancellation are the consumer's concern, not the receiver's: a
/// receive that is still waiting when shutdown is requested is simply dropped.
pub trait MessageReceiver {
    /// The error that can be returned by the MessageReceiver
    type Error: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static;

    /// Receive up to `request.max_messages` messages.
    ///
    /// An empty batch is a normal result once the long-poll wait elapses.
    fn receive_messages(
        &self,
        request: &ReceiveRequest,
    ) -> impl Future<Output = Result<Vec<QueueMessage>, Self::Error>> + Send;

    /// Delete a delivery after it has been processed successfully.
    fn delete_message(
        &self,
        receipt_handle: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
