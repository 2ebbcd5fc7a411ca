//! Type-tag dispatch of decoded messages to registered handlers.

use futures::future::BoxFuture;
use std::{collections::HashMap, sync::Arc};
use tokio_util::sync::CancellationToken;

use crate::{
    decoder::DecodedMessage,
    handlers::{RawTextHandler, SimulatedWorkHandler, UnknownTypeHandler},
    message_processor::{MessageProcessor, ProcessingError},
};

/// Business logic for one kind of message.
///
/// Handlers are stored as trait objects, so the future is boxed. `token` is
/// cancelled when the consumer is shutting down.
pub trait MessageHandler: Send + Sync {
    fn handle<'a>(
        &'a self,
        message: &'a DecodedMessage,
        token: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), ProcessingError>>;
}

/// Which handler a message resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// A handler registered for this exact type tag
    Registered(String),
    /// An envelope whose type tag has no registered handler
    Unknown(String),
    /// A body that did not decode as an envelope
    Raw,
}

/// A [`MessageProcessor`] that picks a handler by the envelope's type tag.
///
/// Envelopes with an unregistered tag go to the unknown-type handler, raw text
/// goes to the raw handler. New message types are added with
/// [`register`](Self::register) without touching the consumer.
///
/// ```rust
/// use sqs_runner::{Dispatcher, Route, decode};
///
/// let dispatcher = Dispatcher::with_default_handlers();
///
/// assert_eq!(
///     dispatcher.route(&decode(r#"{"id":"1","type":"task"}"#)),
///     Route::Registered("task".to_string())
/// );
/// assert_eq!(
///     dispatcher.route(&decode(r#"{"id":"2","type":"foo"}"#)),
///     Route::Unknown("foo".to_string())
/// );
/// assert_eq!(dispatcher.route(&decode("not json")), Route::Raw);
/// ```
pub struct Dispatcher {
    handlers: HashMap<String, Arc<dyn MessageHandler>>,
    unknown: Arc<dyn MessageHandler>,
    raw: Arc<dyn MessageHandler>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Dispatcher with no typed handlers; everything falls through to the
    /// unknown-type or raw handler.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            unknown: Arc::new(UnknownTypeHandler),
            raw: Arc::new(RawTextHandler),
        }
    }

    /// Dispatcher with the stock `task`, `notification` and `data-sync` handlers.
    pub fn with_default_handlers() -> Self {
        Self::new()
            .register("task", SimulatedWorkHandler::task())
            .register("notification", SimulatedWorkHandler::notification())
            .register("data-sync", SimulatedWorkHandler::data_sync())
    }

    /// Register a handler for a type tag, replacing any previous one (builder pattern)
    pub fn register(
        mut self,
        message_type: impl Into<String>,
        handler: impl MessageHandler + 'static,
    ) -> Self {
        self.handlers.insert(message_type.into(), Arc::new(handler));
        self
    }

    /// Replace the handler used for unregistered type tags (builder pattern)
    pub fn with_unknown_handler(mut self, handler: impl MessageHandler + 'static) -> Self {
        self.unknown = Arc::new(handler);
        self
    }

    /// Replace the handler used for raw text bodies (builder pattern)
    pub fn with_raw_handler(mut self, handler: impl MessageHandler + 'static) -> Self {
        self.raw = Arc::new(handler);
        self
    }

    pub fn route(&self, message: &DecodedMessage) -> Route {
        match message {
            DecodedMessage::Envelope(envelope)
                if self.handlers.contains_key(&envelope.message_type) =>
            {
                Route::Registered(envelope.message_type.clone())
            }
            DecodedMessage::Envelope(envelope) => Route::Unknown(envelope.message_type.clone()),
            DecodedMessage::Raw(_) => Route::Raw,
        }
    }

    fn handler_for(&self, message: &DecodedMessage) -> &Arc<dyn MessageHandler> {
        match message {
            DecodedMessage::Envelope(envelope) => self
                .handlers
                .get(&envelope.message_type)
                .unwrap_or(&self.unknown),
            DecodedMessage::Raw(_) => &self.raw,
        }
    }
}

impl MessageProcessor<DecodedMessage> for Dispatcher {
    async fn process_message(
        &self,
        message: &DecodedMessage,
        token: &CancellationToken,
    ) -> Result<(), ProcessingError> {
        self.handler_for(message).handle(message, token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::decode;
    use futures::FutureExt;
    use std::sync::Mutex;

    /// Records the name it was built with every time it runs, suffixed with
    /// `!` when it ran after shutdown was requested.
    struct Recording {
        name: &'static str,
        calls: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl MessageHandler for Recording {
        fn handle<'a>(
            &'a self,
            _message: &'a DecodedMessage,
            token: &'a CancellationToken,
        ) -> BoxFuture<'a, Result<(), ProcessingError>> {
            async move {
                let entry = if token.is_cancelled() {
                    format!("{}!", self.name)
                } else {
                    self.name.to_string()
                };
                self.calls.lock().unwrap().push(entry);
                if self.fail {
                    return Err(format!("{} failed", self.name).into());
                }
                Ok(())
            }
            .boxed()
        }
    }

    fn recording_dispatcher(calls: &Arc<Mutex<Vec<String>>>) -> Dispatcher {
        let handler = |name| Recording {
            name,
            calls: Arc::clone(calls),
            fail: false,
        };
        Dispatcher::new()
            .register("task", handler("task"))
            .register("notification", handler("notification"))
            .register("data-sync", handler("data-sync"))
            .with_unknown_handler(handler("unknown"))
            .with_raw_handler(handler("raw"))
    }

    #[tokio::test]
    async fn test_known_types_reach_their_handler() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let token = CancellationToken::new();
        let dispatcher = recording_dispatcher(&calls);

        for message_type in ["task", "notification", "data-sync"] {
            let body = format!(r#"{{"id":"1","type":"{message_type}","data":{{}}}}"#);
            let decoded = decode(&body);

            assert_eq!(dispatcher.route(&decoded), Route::Registered(message_type.to_string()));
            assert!(dispatcher.process_message(&decoded, &token).await.is_ok());
        }

        assert_eq!(*calls.lock().unwrap(), vec!["task", "notification", "data-sync"]);
    }

    #[tokio::test]
    async fn test_unknown_type_uses_fallback_and_succeeds() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let token = CancellationToken::new();
        let dispatcher = recording_dispatcher(&calls);
        let decoded = decode(r#"{"id":"2","type":"foo"}"#);

        assert_eq!(dispatcher.route(&decoded), Route::Unknown("foo".to_string()));
        assert!(dispatcher.process_message(&decoded, &token).await.is_ok());
        assert_eq!(*calls.lock().unwrap(), vec!["unknown"]);
    }

    #[tokio::test]
    async fn test_type_tags_are_case_sensitive() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = recording_dispatcher(&calls);

        let decoded = decode(r#"{"id":"3","type":"Task"}"#);

        assert_eq!(dispatcher.route(&decoded), Route::Unknown("Task".to_string()));
    }

    #[tokio::test]
    async fn test_raw_text_uses_raw_handler() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let token = CancellationToken::new();
        let dispatcher = recording_dispatcher(&calls);

        for body in ["not json", "{"] {
            let decoded = decode(body);
            assert_eq!(dispatcher.route(&decoded), Route::Raw);
            assert!(dispatcher.process_message(&decoded, &token).await.is_ok());
        }

        assert_eq!(*calls.lock().unwrap(), vec!["raw", "raw"]);
    }

    #[tokio::test]
    async fn test_handler_failure_is_returned() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = Dispatcher::new().register(
            "flaky",
            Recording {
                name: "flaky",
                calls: Arc::clone(&calls),
                fail: true,
            },
        );

        let result = dispatcher
            .process_message(&decode(r#"{"id":"4","type":"flaky"}"#), &CancellationToken::new())
            .await;

        assert_eq!(result.unwrap_err().to_string(), "flaky failed");
    }

    #[tokio::test]
    async fn test_register_replaces_existing_handler() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = recording_dispatcher(&calls).register(
            "task",
            Recording {
                name: "task-v2",
                calls: Arc::clone(&calls),
                fail: false,
            },
        );

        dispatcher
            .process_message(&decode(r#"{"type":"task"}"#), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(*calls.lock().unwrap(), vec!["task-v2"]);
    }

    #[tokio::test]
    async fn test_token_reaches_the_handler() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = recording_dispatcher(&calls);
        let token = CancellationToken::new();

        let task = decode(r#"{"id":"1","type":"task"}"#);
        dispatcher.process_message(&task, &token).await.unwrap();
        token.cancel();
        dispatcher.process_message(&task, &token).await.unwrap();
        dispatcher.process_message(&decode("text"), &token).await.unwrap();

        assert_eq!(*calls.lock().unwrap(), vec!["task", "task!", "raw!"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_handlers_all_succeed() {
        let dispatcher = Dispatcher::with_default_handlers();
        let token = CancellationToken::new();

        for body in [
            r#"{"id":"1","type":"task","data":{}}"#,
            r#"{"id":"2","type":"notification","data":{}}"#,
            r#"{"id":"3","type":"data-sync","data":{}}"#,
            r#"{"id":"4","type":"foo"}"#,
            "not json",
        ] {
            let result = dispatcher.process_message(&decode(body), &token).await;
            assert!(result.is_ok(), "body: {body}");
        }
    }
}
