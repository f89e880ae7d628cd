use rustc_hash::FxHashMap;
use serde_json::json;
use streambus::message::{MessageError, MessageSource, StreamMessage};

#[test]
fn wire_round_trip_preserves_all_fields() {
    let mut extra = FxHashMap::default();
    extra.insert("trace".to_string(), json!("abc-123"));
    let original = StreamMessage::client("chat", json!({"text": "hi"})).with_extra(extra);

    let decoded = StreamMessage::from_wire(&original.to_wire()).expect("decode");

    assert_eq!(decoded, original);
    assert_eq!(decoded.id(), original.id());
    assert_eq!(decoded.channel(), "chat");
    assert_eq!(decoded.source(), MessageSource::Client);
    assert_eq!(decoded.data(), &json!({"text": "hi"}));
    assert_eq!(decoded.extra().get("trace"), Some(&json!("abc-123")));
}

#[test]
fn wire_record_uses_fixed_field_names() {
    let message = StreamMessage::server("alerts", json!({"level": "warn"}));
    let wire = message.to_wire();

    assert_eq!(wire["id"], json!(message.id()));
    assert_eq!(wire["channel"], json!("alerts"));
    assert_eq!(wire["source"], json!("server"));
    assert_eq!(wire["data"], json!({"level": "warn"}));
    assert_eq!(wire["extra"], json!({}));
}

#[test]
fn lenient_decode_defaults_absent_fields() {
    let decoded = StreamMessage::from_wire(&json!({})).expect("decode empty object");

    assert!(!decoded.id().is_empty());
    assert_eq!(decoded.channel(), "");
    assert_eq!(decoded.source(), MessageSource::Server);
    assert_eq!(decoded.data(), &json!({}));
    assert!(decoded.extra().is_empty());
}

#[test]
fn lenient_decode_generates_distinct_ids() {
    let a = StreamMessage::from_wire(&json!({"channel": "c"})).expect("decode");
    let b = StreamMessage::from_wire(&json!({"channel": "c"})).expect("decode");
    assert_ne!(a.id(), b.id());
}

#[test]
fn decode_keeps_supplied_id() {
    let decoded =
        StreamMessage::from_wire(&json!({"id": "fixed-id", "channel": "chat"})).expect("decode");
    assert_eq!(decoded.id(), "fixed-id");
}

#[test]
fn unrecognized_source_tag_is_rejected() {
    let result = StreamMessage::from_wire(&json!({"source": "gateway"}));
    match result {
        Err(MessageError::UnknownSource { tag }) => assert_eq!(tag, "gateway"),
        other => panic!("expected UnknownSource, got {other:?}"),
    }
}

#[test]
fn non_string_source_is_rejected() {
    assert!(StreamMessage::from_wire(&json!({"source": 3})).is_err());
}

#[test]
fn null_source_falls_back_to_server() {
    let decoded = StreamMessage::from_wire(&json!({"source": null})).expect("decode");
    assert_eq!(decoded.source(), MessageSource::Server);
}

#[test]
fn non_object_record_is_rejected() {
    assert!(matches!(
        StreamMessage::from_wire(&json!("just a string")),
        Err(MessageError::NotAnObject)
    ));
}

#[test]
fn with_source_produces_a_new_value() {
    let claimed = StreamMessage::server("chat", json!("spoofed"));
    let forced = claimed.clone().with_source(MessageSource::Client);

    assert_eq!(claimed.source(), MessageSource::Server);
    assert_eq!(forced.source(), MessageSource::Client);
    assert_eq!(forced.id(), claimed.id());
    assert_eq!(forced.data(), claimed.data());
}

#[test]
fn wire_string_is_one_json_object() {
    let message = StreamMessage::client("chat", json!("hi"));
    let rendered = message.to_wire_string().expect("render");
    let parsed: serde_json::Value = serde_json::from_str(&rendered).expect("parse");
    assert_eq!(parsed["source"], json!("client"));
}
