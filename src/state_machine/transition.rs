//! Pure state transition function
//!
//! Every input (local action or server event) folds into the next
//! `ConversationState`. Network work is requested through [`Effect`]s and
//! performed by the session runtime.

use super::state::{
    ConversationState, Message, Role, Stamp, STATUS_CONNECTING, STATUS_ERROR, STATUS_READY,
    STATUS_RESPONDING,
};
use super::{Effect, Event, LocalAction};
use crate::protocol::{ServerEvent, TurnRequest};

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConversationState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    #[must_use]
    pub fn new(state: ConversationState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Pure transition function
///
/// Given the same state, event and stamp it always produces the same result.
/// `stamp` supplies the id and timestamp for a message created by this step.
#[must_use]
pub fn transition(state: &ConversationState, event: Event, stamp: &Stamp) -> TransitionResult {
    let mut next = state.clone();

    match event {
        // ============================================================
        // Local actions
        // ============================================================
        Event::Local(LocalAction::UpdateInput { text }) => {
            next.input_text = text;
            TransitionResult::new(next)
        }

        Event::Local(LocalAction::Send { text }) => {
            if text.trim().is_empty() {
                return TransitionResult::new(next);
            }

            // Supersession: whatever the previous turn streamed so far is final
            finish_active_reply(&mut next);

            let history = next.messages.clone();
            let message = Message::new(stamp.id.clone(), Role::User, text, stamp.now);
            next.messages.push(message.clone());
            next.input_text.clear();
            next.error = None;
            next.streaming = true;
            next.status_text = Some(STATUS_CONNECTING.to_string());

            let request = TurnRequest {
                conversation_id: next.conversation_id.clone(),
                history,
                new_message: message,
                voice_preferred: next.listening,
            };
            TransitionResult::new(next).with_effect(Effect::StartTurn { request })
        }

        Event::Local(LocalAction::SetListening { listening }) => {
            next.listening = listening;
            TransitionResult::new(next)
        }

        Event::Local(LocalAction::RecognitionFailed { message }) => {
            next.listening = false;
            TransitionResult::new(next).with_effect(Effect::recognition_error(message))
        }

        // ============================================================
        // Server events
        // ============================================================
        Event::Server(ServerEvent::Status { text }) => {
            next.status_text = Some(text);
            TransitionResult::new(next)
        }

        Event::Server(ServerEvent::ConversationAssigned { id }) => {
            next.conversation_id = Some(id);
            TransitionResult::new(next)
        }

        Event::Server(ServerEvent::TokenDelta { text }) => {
            if !text.is_empty() {
                append_delta(&mut next, text, stamp);
            }
            TransitionResult::new(next)
        }

        Event::Server(ServerEvent::Complete { .. }) => {
            finish_active_reply(&mut next);
            next.streaming = false;
            next.status_text = Some(STATUS_READY.to_string());
            TransitionResult::new(next)
        }

        Event::Server(ServerEvent::Error { message }) => {
            finish_active_reply(&mut next);
            next.streaming = false;
            next.status_text = Some(STATUS_ERROR.to_string());
            next.error = Some(message);
            TransitionResult::new(next)
        }

        Event::Server(ServerEvent::Unknown { kind }) => {
            tracing::debug!(kind = %kind, "Ignoring unknown server event");
            TransitionResult::new(next)
        }
    }
}

fn append_delta(state: &mut ConversationState, text: String, stamp: &Stamp) {
    let active = state.active_reply.clone();
    if let Some(message) = active.as_deref().and_then(|id| state.message_mut(id)) {
        message.text.push_str(&text);
        return;
    }

    let mut reply = Message::new(stamp.id.clone(), Role::Assistant, text, stamp.now);
    reply.streaming = true;
    state.active_reply = Some(reply.id.clone());
    state.messages.push(reply);
    state.streaming = true;
    state.status_text = Some(STATUS_RESPONDING.to_string());
}

/// Freeze the message receiving deltas, if any, and stop tracking it
fn finish_active_reply(state: &mut ConversationState) {
    if let Some(id) = state.active_reply.take() {
        if let Some(message) = state.message_mut(&id) {
            message.streaming = false;
        }
    }
}
