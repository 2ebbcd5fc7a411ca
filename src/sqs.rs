//! AWS SQS implementation of [`MessageReceiver`].

use anyhow::Context;
use aws_sdk_sqs::types::{Message, MessageSystemAttributeName};
use std::collections::HashMap;

use crate::{
    config::Settings,
    message_receiver::{MessageReceiver, QueueMessage, ReceiveRequest},
};

/// Build an SQS client for the configured region, pointed at the override
/// endpoint when one is set (e.g. LocalStack).
pub async fn build_client(settings: &Settings) -> aws_sdk_sqs::Client {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_sdk_sqs::config::Region::new(settings.region.clone()));

    if let Some(endpoint_url) = settings.endpoint_url.as_deref() {
        tracing::info!(endpoint_url, "using custom aws endpoint");
        loader = loader.endpoint_url(endpoint_url);
    }

    let aws_config = loader.load().await;
    aws_sdk_sqs::Client::new(&aws_config)
}

#[derive(Clone, Debug)]
pub struct SqsReceiver {
    inner: aws_sdk_sqs::Client,
    queue_url: String,
}

impl SqsReceiver {
    pub fn new(client: aws_sdk_sqs::Client, queue_url: impl Into<String>) -> Self {
        Self {
            inner: client,
            queue_url: queue_url.into(),
        }
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }

    pub async fn receive(&self, request: &ReceiveRequest) -> anyhow::Result<Vec<QueueMessage>> {
        let recv_output = self
            .inner
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(request.max_messages)
            .wait_time_seconds(request.wait_time_seconds)
            .visibility_timeout(request.visibility_timeout_seconds)
            .message_system_attribute_names(MessageSystemAttributeName::All)
            .message_attribute_names("All")
            .send()
            .await
            .context("failed to receive messages from sqs")?;

        Ok(recv_output
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(into_queue_message)
            .collect())
    }

    pub async fn delete(&self, receipt_handle: &str) -> anyhow::Result<()> {
        if receipt_handle.is_empty() {
            anyhow::bail!("receipt handle is empty");
        }

        self.inner
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .context("failed to delete message from sqs")?;

        Ok(())
    }
}

impl MessageReceiver for SqsReceiver {
    type Error = anyhow::Error;

    async fn receive_messages(
        &self,
        request: &ReceiveRequest,
    ) -> Result<Vec<QueueMessage>, Self::Error> {
        self.receive(request).await
    }

    async fn delete_message(&self, receipt_handle: &str) -> Result<(), Self::Error> {
        self.delete(receipt_handle).await
    }
}

/// Convert an SDK message. Deliveries without a receipt handle cannot be
/// deleted and are dropped.
fn into_queue_message(message: Message) -> Option<QueueMessage> {
    let message_id = message.message_id.unwrap_or_default();

    let Some(receipt_handle) = message.receipt_handle else {
        tracing::warn!(
            message_id = %message_id,
            "received message without a receipt handle, skipping"
        );
        return None;
    };

    let mut attributes: HashMap<String, String> = message
        .attributes
        .unwrap_or_default()
        .into_iter()
        .map(|(name, value)| (name.as_str().to_string(), value))
        .collect();

    for (name, value) in message.message_attributes.unwrap_or_default() {
        if let Some(string_value) = value.string_value {
            attributes.insert(name, string_value);
        }
    }

    Some(QueueMessage {
        message_id,
        body: message.body.unwrap_or_default(),
        receipt_handle,
        attributes,
    })
}
