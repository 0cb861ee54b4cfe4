//! Inputs to the conversation state machine

use crate::protocol::ServerEvent;

/// Actions originating on the client side
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalAction {
    /// The input box (or an interim transcript) changed
    UpdateInput { text: String },
    /// The user submitted text
    Send { text: String },
    /// Voice capture was switched on or off
    SetListening { listening: bool },
    /// The speech recognizer reported a failure
    RecognitionFailed { message: String },
}

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Local(LocalAction),
    Server(ServerEvent),
}

impl Event {
    pub fn update_input(text: impl Into<String>) -> Self {
        Event::Local(LocalAction::UpdateInput { text: text.into() })
    }

    pub fn send(text: impl Into<String>) -> Self {
        Event::Local(LocalAction::Send { text: text.into() })
    }
}

impl From<LocalAction> for Event {
    fn from(action: LocalAction) -> Self {
        Event::Local(action)
    }
}

impl From<ServerEvent> for Event {
    fn from(event: ServerEvent) -> Self {
        Event::Server(event)
    }
}
