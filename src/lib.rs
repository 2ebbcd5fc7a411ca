//! # sqs-runner
//!
//! A long-running worker that pulls batches of messages from an AWS SQS queue,
//! dispatches each message to a handler chosen by its `type` field and deletes
//! the messages that were handled successfully.
//!
//! ## Architecture
//!
//! - **[`MessageReceiver`]**: receives batches from the queue and deletes
//!   messages ([`SqsReceiver`] for SQS)
//! - **[`decode`]**: turns a body into an [`Envelope`], or keeps it as raw text
//!   when it is not one
//! - **[`MessageProcessor`]**: processes a decoded message; [`Dispatcher`] picks
//!   a [`MessageHandler`] by type tag
//! - **[`Consumer`]**: the poll loop tying these together under a
//!   [`CancellationToken`](tokio_util::sync::CancellationToken), which is also
//!   handed to every processor
//!
//! ### How it Works
//!
//! The consumer repeatedly:
//! 1. Receives up to `max_messages` messages, long-polling for `wait_time_seconds`
//! 2. Spawns one task per message that decodes, processes and, on success, deletes it
//! 3. Waits for every task of the batch before polling again
//!
//! A failed receive is logged and retried after a fixed backoff. A failed message
//! is logged and left in the queue, which redelivers it once its visibility
//! timeout expires. A failed delete is logged and not retried.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sqs_runner::{Consumer, Dispatcher, Settings, SqsReceiver};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let settings = Settings::from_env()?;
//! let client = sqs_runner::sqs::build_client(&settings).await;
//!
//! let consumer = Consumer::new(
//!     SqsReceiver::new(client, settings.queue_url.clone()),
//!     Dispatcher::with_default_handlers(),
//!     settings.consumer_config(),
//! );
//!
//! let token = CancellationToken::new();
//! let _signal_listener = sqs_runner::lifecycle::cancel_on_shutdown_signal(token.clone());
//! consumer.run(token).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod consumer;
pub mod decoder;
pub mod dispatcher;
pub mod handlers;
pub mod health;
pub mod lifecycle;
pub mod message_processor;
pub mod message_receiver;
pub mod sqs;

pub use config::Settings;
pub use consumer::{BatchSummary, Consumer, ConsumerConfig, MessageOutcome};
pub use decoder::{decode, DecodedMessage, Envelope};
pub use dispatcher::{Dispatcher, MessageHandler, Route};
pub use message_processor::{MessageProcessor, ProcessingError};
pub use message_receiver::{MessageReceiver, QueueMessage, ReceiveRequest};
pub use sqs::SqsReceiver;
