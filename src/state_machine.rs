//! Core conversation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Effect, Notice};
pub use event::{Event, LocalAction};
pub use state::{ConversationState, Message, Role, Stamp};
pub use transition::{transition, TransitionResult};
