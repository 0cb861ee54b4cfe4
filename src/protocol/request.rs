//! Outbound turn payload

use crate::state_machine::{Message, Role};
use serde::Serialize;

/// Everything needed to open one turn against the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRequest {
    pub conversation_id: Option<String>,
    /// Prior messages in turn order, excluding `new_message`
    pub history: Vec<Message>,
    pub new_message: Message,
    pub voice_preferred: bool,
}

impl TurnRequest {
    /// Serialize into the `/chat` request body
    #[must_use]
    pub fn to_body(&self) -> ChatRequest<'_> {
        ChatRequest {
            conversation_id: self.conversation_id.as_deref(),
            voice: self.voice_preferred,
            messages: self
                .history
                .iter()
                .chain(std::iter::once(&self.new_message))
                .map(MessagePayload::from)
                .collect(),
        }
    }
}

/// Body of `POST <base>/chat`
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub conversation_id: Option<&'a str>,
    pub voice: bool,
    pub messages: Vec<MessagePayload<'a>>,
}

#[derive(Debug, Serialize)]
pub struct MessagePayload<'a> {
    pub id: &'a str,
    pub role: Role,
    pub content: &'a str,
}

impl<'a> From<&'a Message> for MessagePayload<'a> {
    fn from(message: &'a Message) -> Self {
        Self {
            id: &message.id,
            role: message.role,
            content: &message.text,
        }
    }
}
