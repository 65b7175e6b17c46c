//! Units received from the upstream and events sent to the client.
//!
//! Wire framing (the `data:` prefix and blank-line separator) belongs to the
//! HTTP adapter; this module only decides what each event's data line holds.

use serde::Serialize;
use serde_json::{Map, Value};

/// Reserved data line that marks a completed stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Key under which plain text fragments are wrapped.
pub const TEXT_KEY: &str = "text";

/// One opaque unit of the upstream's incremental reply.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamUnit {
    /// A JSON object, relayed unchanged.
    Record(Map<String, Value>),
    /// A text fragment.
    Text(String),
}

impl UpstreamUnit {
    /// Classifies the payload of one upstream `data:` line.
    ///
    /// Blank payloads carry nothing and yield `None`.
    pub fn from_data(data: &str) -> Option<Self> {
        if data.trim().is_empty() {
            return None;
        }
        match serde_json::from_str::<Value>(data) {
            Ok(Value::Object(record)) => Some(UpstreamUnit::Record(record)),
            _ => Some(UpstreamUnit::Text(data.to_string())),
        }
    }

    /// Upstream error message, if this record reports one.
    ///
    /// The upstream signals failure in-band with an `error` member, either a
    /// string or an object with a `message`.
    pub fn error_message(&self) -> Option<String> {
        let UpstreamUnit::Record(record) = self else {
            return None;
        };
        match record.get("error")? {
            Value::String(message) => Some(message.clone()),
            Value::Object(details) => Some(
                details
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("upstream reported an error")
                    .to_string(),
            ),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// Why a stream that already delivered events had to stop early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamFailure {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub message: String,
}

impl StreamFailure {
    pub fn upstream(message: impl Into<String>) -> Self {
        Self {
            kind: "stream_failure",
            message: message.into(),
        }
    }

    pub fn idle_timeout(secs: u64) -> Self {
        Self {
            kind: "idle_timeout",
            message: format!("upstream sent nothing for {}s", secs),
        }
    }

    pub fn max_duration(secs: u64) -> Self {
        Self {
            kind: "max_duration_exceeded",
            message: format!("stream exceeded {}s", secs),
        }
    }
}

/// One unit of the normalized stream delivered to a client.
#[derive(Debug, Clone, PartialEq)]
pub enum OutgoingEvent {
    /// A structured payload.
    Payload(Map<String, Value>),
    /// Best-effort in-band error; always the last event of a failed stream.
    Error(StreamFailure),
    /// Terminal sentinel; always the last event of a completed stream.
    Done,
}

impl OutgoingEvent {
    /// Wraps an upstream unit: records unchanged, text under [`TEXT_KEY`].
    pub fn from_unit(unit: UpstreamUnit) -> Self {
        match unit {
            UpstreamUnit::Record(record) => OutgoingEvent::Payload(record),
            UpstreamUnit::Text(text) => {
                let mut payload = Map::new();
                payload.insert(TEXT_KEY.to_string(), Value::String(text));
                OutgoingEvent::Payload(payload)
            }
        }
    }

    /// The event's data line content.
    pub fn to_data(&self) -> String {
        match self {
            OutgoingEvent::Payload(payload) => Value::Object(payload.clone()).to_string(),
            OutgoingEvent::Error(failure) => serde_json::json!({ "error": failure }).to_string(),
            OutgoingEvent::Done => DONE_SENTINEL.to_string(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OutgoingEvent::Error(_) | OutgoingEvent::Done)
    }
}
