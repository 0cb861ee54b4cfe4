//! Server events and the frame decoder
//!
//! Each SSE frame's `data` field is a JSON object with a `type` discriminator.
//! Unknown discriminators decode to [`ServerEvent::Unknown`] so newer backends
//! can add event kinds without breaking older clients.

use serde::{Deserialize, Serialize};
use thiserror::Error;

const UNKNOWN_ERROR: &str = "Unknown error";

/// A decoded server event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// Progress text from the backend (e.g. "Calling light.turn_on…")
    Status { text: String },
    /// The backend assigned (or confirmed) the conversation id
    ConversationAssigned { id: String },
    /// Incremental fragment of the assistant reply
    TokenDelta { text: String },
    /// The reply is finished; `text` optionally repeats the full reply
    Complete { text: Option<String> },
    /// The backend reported a failure for this turn
    Error { message: String },
    /// Event kind this client does not understand
    Unknown { kind: String },
}

impl ServerEvent {
    /// Whether this event ends the turn's stream
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, ServerEvent::Complete { .. } | ServerEvent::Error { .. })
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }
}

/// Frame decoding failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Not a JSON object, or no `type` discriminator
    #[error("Malformed event frame: {0}")]
    Malformed(String),
    #[error("Event frame is missing {0}")]
    MissingField(&'static str),
}

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> Self {
        DecodeError::Malformed(e.to_string())
    }
}

/// Wire shape of one event frame
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEvent {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Decode one frame into a [`ServerEvent`].
///
/// Extra fields are ignored. Pure: the same frame always yields the same result.
///
/// # Errors
///
/// Returns [`DecodeError::Malformed`] when the frame is not a JSON object or
/// has no `type`, and [`DecodeError::MissingField`] for a `conversation`
/// event without any id.
pub fn decode(frame: &str) -> Result<ServerEvent, DecodeError> {
    let wire: WireEvent = serde_json::from_str(frame)?;
    from_wire(wire)
}

/// Interpret an already-parsed wire frame
///
/// # Errors
///
/// See [`decode`].
pub fn from_wire(wire: WireEvent) -> Result<ServerEvent, DecodeError> {
    let kind = wire
        .kind
        .ok_or_else(|| DecodeError::Malformed("missing type".to_string()))?;
    let event = match kind.as_str() {
        "status" => ServerEvent::Status {
            text: wire.content.or(wire.status).unwrap_or_default(),
        },
        "conversation" => ServerEvent::ConversationAssigned {
            id: wire
                .conversation_id
                .or(wire.content)
                .ok_or(DecodeError::MissingField("conversation_id"))?,
        },
        "token" | "delta" => ServerEvent::TokenDelta {
            text: wire.content.unwrap_or_default(),
        },
        "complete" => ServerEvent::Complete { text: wire.content },
        "error" => ServerEvent::Error {
            message: wire.content.unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
        },
        _ => ServerEvent::Unknown { kind },
    };
    Ok(event)
}

/// Encode an event in the backend's wire shape
#[must_use]
pub fn to_wire(event: &ServerEvent) -> WireEvent {
    let (kind, content, conversation_id) = match event {
        ServerEvent::Status { text } => ("status", Some(text.clone()), None),
        ServerEvent::ConversationAssigned { id } => ("conversation", None, Some(id.clone())),
        ServerEvent::TokenDelta { text } => ("token", Some(text.clone()), None),
        ServerEvent::Complete { text } => ("complete", text.clone(), None),
        ServerEvent::Error { message } => ("error", Some(message.clone()), None),
        ServerEvent::Unknown { kind } => {
            return WireEvent {
                kind: Some(kind.clone()),
                ..WireEvent::default()
            }
        }
    };
    WireEvent {
        kind: Some(kind.to_string()),
        content,
        conversation_id,
        status: None,
    }
}
