//! Turns a raw message body into the form the dispatcher works on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structured message body.
///
/// Missing fields take their defaults, so `{"type":"task"}` is still an
/// envelope. A field of the wrong JSON type, or a timestamp that is not
/// RFC 3339, makes the whole body undecodable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub message_type: String,
    /// Application payload, passed through untouched
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Result of decoding a message body.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedMessage {
    Envelope(Envelope),
    /// Body that is not a JSON object of the envelope shape, kept verbatim
    Raw(String),
}

impl DecodedMessage {
    /// Type tag of the envelope, `None` for raw text.
    pub fn message_type(&self) -> Option<&str> {
        match self {
            DecodedMessage::Envelope(envelope) => Some(&envelope.message_type),
            DecodedMessage::Raw(_) => None,
        }
    }
}

/// Decode a message body. Never fails: anything that is not a JSON object
/// of the [`Envelope`] shape comes back as [`DecodedMessage::Raw`].
///
/// Members set to `null` are treated as absent, and the last of duplicate
/// keys wins.
pub fn decode(body: &str) -> DecodedMessage {
    match parse_envelope(body) {
        Ok(envelope) => DecodedMessage::Envelope(envelope),
        Err(e) => {
            tracing::debug!(error = %e, "message body is not an envelope, treating as raw text");
            DecodedMessage::Raw(body.to_string())
        }
    }
}

fn parse_envelope(body: &str) -> Result<Envelope, serde_json::Error> {
    let serde_json::Value::Object(mut fields) = serde_json::from_str(body)? else {
        return Err(serde::de::Error::custom("message body is not a json object"));
    };
    fields.retain(|_, value| !value.is_null());
    serde_json::from_value(serde_json::Value::Object(fields))
}
