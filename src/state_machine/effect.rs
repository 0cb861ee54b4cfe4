//! Effects produced by state transitions

use crate::protocol::TurnRequest;

/// Effects to be executed by the session after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open a new turn, superseding any turn still in flight
    StartTurn { request: TurnRequest },
    /// Surface a transient notice without touching `state.error`
    Notify { notice: Notice },
}

/// Transient, non-fatal notices for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    RecognitionError { message: String },
}

impl Effect {
    pub fn recognition_error(message: impl Into<String>) -> Self {
        Effect::Notify {
            notice: Notice::RecognitionError {
                message: message.into(),
            },
        }
    }
}
