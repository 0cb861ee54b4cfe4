//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across arbitrary input sequences.

use super::state::*;
use super::transition::*;
use super::*;
use crate::protocol::ServerEvent;
use chrono::{TimeZone, Utc};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn stamp(i: usize) -> Stamp {
    Stamp::fixed(format!("m{i}"), Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap())
}

fn fold(events: Vec<Event>) -> ConversationState {
    events
        .into_iter()
        .enumerate()
        .fold(ConversationState::default(), |state, (i, event)| {
            transition(&state, event, &stamp(i)).new_state
        })
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_text() -> impl Strategy<Value = String> {
    "[a-zA-Z ]{0,12}"
}

fn arb_local_action() -> impl Strategy<Value = LocalAction> {
    prop_oneof![
        arb_text().prop_map(|text| LocalAction::UpdateInput { text }),
        arb_text().prop_map(|text| LocalAction::Send { text }),
        any::<bool>().prop_map(|listening| LocalAction::SetListening { listening }),
        arb_text().prop_map(|message| LocalAction::RecognitionFailed { message }),
    ]
}

fn arb_server_event() -> impl Strategy<Value = ServerEvent> {
    prop_oneof![
        arb_text().prop_map(|text| ServerEvent::Status { text }),
        "[a-z0-9]{4}".prop_map(|id| ServerEvent::ConversationAssigned { id }),
        arb_text().prop_map(|text| ServerEvent::TokenDelta { text }),
        arb_text().prop_map(|text| ServerEvent::TokenDelta { text }),
        Just(ServerEvent::Complete { text: None }),
        arb_text().prop_map(|message| ServerEvent::Error { message }),
        Just(ServerEvent::Unknown { kind: "ping".to_string() }),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        1 => arb_local_action().prop_map(Event::Local),
        3 => arb_server_event().prop_map(Event::Server),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_deltas_concatenate_in_order(deltas in proptest::collection::vec("[a-zA-Z .]{0,8}", 0..20)) {
        let mut events = vec![Event::send("question")];
        events.extend(deltas.iter().map(|d| Event::Server(ServerEvent::TokenDelta { text: d.clone() })));
        events.push(Event::Server(ServerEvent::Complete { text: None }));

        let state = fold(events);
        let assistant: Vec<&Message> = state.messages.iter().filter(|m| m.role == Role::Assistant).collect();
        let expected: String = deltas.concat();

        if expected.is_empty() {
            prop_assert!(assistant.is_empty());
        } else {
            prop_assert_eq!(assistant.len(), 1);
            prop_assert_eq!(&assistant[0].text, &expected);
            prop_assert!(!assistant[0].streaming);
        }
        prop_assert_eq!(state.status_text.as_deref(), Some(STATUS_READY));
    }

    #[test]
    fn prop_at_most_one_streaming_message(events in proptest::collection::vec(arb_event(), 0..60)) {
        let mut state = ConversationState::default();
        for (i, event) in events.into_iter().enumerate() {
            state = transition(&state, event, &stamp(i)).new_state;

            prop_assert!(state.streaming_count() <= 1);
            if let Some(streaming) = state.messages.iter().find(|m| m.streaming) {
                prop_assert_eq!(streaming.role, Role::Assistant);
                prop_assert_eq!(Some(&streaming.id), state.active_reply.as_ref());
                let last_assistant = state.messages.iter().rev().find(|m| m.role == Role::Assistant);
                prop_assert_eq!(last_assistant.map(|m| &m.id), Some(&streaming.id));
            }
        }
    }

    #[test]
    fn prop_messages_are_append_only(events in proptest::collection::vec(arb_event(), 0..40)) {
        let mut state = ConversationState::default();
        for (i, event) in events.into_iter().enumerate() {
            let next = transition(&state, event, &stamp(i)).new_state;

            prop_assert!(next.messages.len() >= state.messages.len());
            for (before, after) in state.messages.iter().zip(&next.messages) {
                prop_assert_eq!(&before.id, &after.id);
                prop_assert_eq!(before.role, after.role);
                prop_assert!(after.text.starts_with(&before.text));
                // Frozen messages never change again
                if !before.streaming {
                    prop_assert_eq!(before, after);
                }
            }
            state = next;
        }
    }

    #[test]
    fn prop_blank_send_changes_nothing(events in proptest::collection::vec(arb_event(), 0..20), blank in "[ \t\n]{0,4}") {
        let state = fold(events);
        let result = transition(&state, Event::send(blank), &stamp(999));
        prop_assert_eq!(result.new_state, state);
        prop_assert!(result.effects.is_empty());
    }

    #[test]
    fn prop_error_is_cleared_by_next_send(text in "[a-z]{1,8}", message in arb_text()) {
        let state = fold(vec![
            Event::send("first"),
            Event::Server(ServerEvent::Error { message }),
            Event::send(text),
        ]);
        prop_assert_eq!(state.error, None);
        prop_assert!(state.streaming);
    }
}
