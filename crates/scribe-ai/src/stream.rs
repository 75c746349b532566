//! Inbound stream event types and parsing

use serde::Deserialize;
use std::pin::Pin;
use tokio_stream::Stream;

use crate::error::Result;

/// Events recognized on the inbound stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Connection handshake
    Connected { session_id: Option<String> },
    /// Content fragment and/or terminal signal from `choices[0]`
    Chunk {
        session_id: Option<String>,
        delta: Option<String>,
        finish_reason: Option<String>,
    },
    /// Explicit upstream failure
    Error { message: String },
    /// Valid JSON with no recognized shape
    Unknown,
}

impl StreamEvent {
    /// Parse a single `data:` payload
    pub fn parse(data: &str) -> Result<Self> {
        let raw: RawEvent = serde_json::from_str(data)?;
        Ok(raw.into())
    }

    /// Session id echoed by the backend, if any
    pub fn session_id(&self) -> Option<&str> {
        match self {
            StreamEvent::Connected { session_id } | StreamEvent::Chunk { session_id, .. } => {
                session_id.as_deref()
            }
            _ => None,
        }
    }
}

/// A stream of raw `data:` payloads. Dropping it closes the connection.
pub type RawEventStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type", default)]
    event_type: Option<String>,
    #[serde(rename = "sessionId", default)]
    session_id: Option<String>,
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

impl From<RawEvent> for StreamEvent {
    fn from(raw: RawEvent) -> Self {
        if let Some(error) = raw.error {
            let message = match error {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            return StreamEvent::Error { message };
        }

        if raw.event_type.as_deref() == Some("connected") {
            return StreamEvent::Connected {
                session_id: raw.session_id,
            };
        }

        match raw.choices.into_iter().next() {
            Some(choice) => StreamEvent::Chunk {
                session_id: raw.session_id,
                delta: choice.delta.and_then(|d| d.content),
                finish_reason: choice.finish_reason,
            },
            None => StreamEvent::Unknown,
        }
    }
}
