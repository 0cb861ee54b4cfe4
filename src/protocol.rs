//! Wire protocol spoken with the chat backend
//!
//! Outbound: one JSON `ChatRequest` per turn. Inbound: a server-sent-event
//! stream whose frames decode into [`ServerEvent`]s.

mod event;
mod request;

#[cfg(test)]
mod proptests;

pub use event::{decode, from_wire, to_wire, DecodeError, ServerEvent, WireEvent};
pub use request::{ChatRequest, MessagePayload, TurnRequest};
