//! This module provides a trait to process the messages that are grabbed via the MessageReceiver.

use futures::Future;
use tokio_util::sync::CancellationToken;

/// Error returned by a failed processing attempt.
pub type ProcessingError = Box<dyn std::error::Error + Send + Sync>;

/// A trait for message processors that defines how to handle individual messages.
///
/// # Error Handling
///
/// Processing errors are logged by the consumer. Failed messages are NOT
/// deleted, so the queue redelivers them once their visibility timeout runs
/// out. Successful processing results in the message being deleted.
///
/// Implementations must tolerate seeing the same message more than once: a
/// lost delete request means the queue will hand it out again.
///
/// # Cancellation
///
/// `token` is the consumer's shutdown token. The consumer never aborts a
/// dispatched message, so a processor that wants to stop early on shutdown
/// has to watch the token itself and return an error, leaving the message for
/// redelivery.
pub trait MessageProcessor<P> {
    /// Process a single decoded message
    ///
    /// * `Ok(())` - processed, the message will be deleted
    /// * `Err(ProcessingError)` - failed, the message is left for redelivery
    fn process_message(
        &self,
        payload: &P,
        token: &CancellationToken,
    ) -> impl Future<Output = Result<(), ProcessingError>> + Send;
}
