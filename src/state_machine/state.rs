//! Conversation state types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Status texts published in `ConversationState::status_text`
pub const STATUS_CONNECTING: &str = "connecting";
pub const STATUS_RESPONDING: &str = "responding";
pub const STATUS_READY: &str = "ready";
pub const STATUS_ERROR: &str = "error";

// ============================================================================
// Messages
// ============================================================================

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    Tool,
    System,
}

impl Role {
    /// Wire name of the role
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
            Role::System => "system",
        }
    }
}

/// A single chat message.
///
/// The `id` is unique for the lifetime of the process and never reused. `text`
/// only ever grows while `streaming` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub text: String,
    pub streaming: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(id: impl Into<String>, role: Role, text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            role,
            text: text.into(),
            streaming: false,
            created_at,
        }
    }

    /// A user message with a fresh id, stamped now
    pub fn user(text: impl Into<String>) -> Self {
        let stamp = Stamp::fresh();
        Self::new(stamp.id, Role::User, text, stamp.now)
    }
}

// ============================================================================
// Stamp - identity and time supplied to the transition function
// ============================================================================

/// Identity and clock reading handed to [`super::transition`].
///
/// Keeps the transition function pure: any message it creates takes its id
/// and timestamp from here instead of reaching for a generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamp {
    pub id: String,
    pub now: DateTime<Utc>,
}

impl Stamp {
    #[must_use]
    pub fn fresh() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            now: Utc::now(),
        }
    }

    pub fn fixed(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self { id: id.into(), now }
    }
}

// ============================================================================
// Conversation State
// ============================================================================

/// Full client-side view of one conversation.
///
/// Invariant: at most one message has `streaming == true`, and when present it
/// is the assistant message referenced by `active_reply`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub conversation_id: Option<String>,
    pub messages: Vec<Message>,
    pub input_text: String,
    pub streaming: bool,
    pub listening: bool,
    pub status_text: Option<String>,
    pub error: Option<String>,
    /// Id of the assistant message receiving deltas for the current turn
    #[serde(skip)]
    pub active_reply: Option<String>,
}

impl ConversationState {
    #[must_use]
    pub fn new(listening: bool) -> Self {
        Self {
            listening,
            ..Self::default()
        }
    }

    /// The message currently receiving deltas, if any
    #[must_use]
    pub fn streaming_message(&self) -> Option<&Message> {
        let id = self.active_reply.as_deref()?;
        self.messages.iter().find(|m| m.id == id)
    }

    /// Number of messages flagged as streaming
    #[must_use]
    pub fn streaming_count(&self) -> usize {
        self.messages.iter().filter(|m| m.streaming).count()
    }

    pub(crate) fn message_mut(&mut self, id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }
}
