//! Property-based tests for the frame decoder

use super::event::*;
use proptest::prelude::*;

const KNOWN_KINDS: &[&str] = &["status", "conversation", "token", "delta", "complete", "error"];

fn arb_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,!?…\"\\\\]{0,40}"
}

fn arb_event() -> impl Strategy<Value = ServerEvent> {
    prop_oneof![
        arb_text().prop_map(|text| ServerEvent::Status { text }),
        "[a-z0-9]{1,16}".prop_map(|id| ServerEvent::ConversationAssigned { id }),
        arb_text().prop_map(|text| ServerEvent::TokenDelta { text }),
        proptest::option::of(arb_text()).prop_map(|text| ServerEvent::Complete { text }),
        arb_text().prop_map(|message| ServerEvent::Error { message }),
        "[a-z_]{1,12}"
            .prop_filter("must not collide with a known kind", |k| !KNOWN_KINDS.contains(&k.as_str()))
            .prop_map(|kind| ServerEvent::Unknown { kind }),
    ]
}

proptest! {
    #[test]
    fn prop_decode_inverts_wire_encoding(event in arb_event()) {
        let frame = serde_json::to_string(&to_wire(&event)).unwrap();
        prop_assert_eq!(decode(&frame).unwrap(), event);
    }

    #[test]
    fn prop_decode_is_deterministic(frame in "\\PC{0,64}") {
        let first = decode(&frame).map_err(|e| e.to_string());
        let second = decode(&frame).map_err(|e| e.to_string());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_extra_fields_do_not_change_result(event in arb_event(), extra in "[a-z]{1,8}") {
        let mut value = serde_json::to_value(to_wire(&event)).unwrap();
        value[format!("x_{extra}")] = serde_json::json!({"nested": [1, 2, 3]});
        prop_assert_eq!(decode(&value.to_string()).unwrap(), event);
    }
}
