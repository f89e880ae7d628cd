use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rustc_hash::FxHashMap;
use serde_json::json;
use streambus::bus::{CollectorListener, StreamDirectory, WILDCARD_CHANNEL};
use streambus::delivery::DeliveryConfig;
use streambus::message::{MessageError, MessageSource};
use streambus::service::{ServiceError, StreamService, Subscription};

fn service() -> StreamService {
    StreamService::with_delivery_config(
        Arc::new(StreamDirectory::new()),
        DeliveryConfig::default().with_heartbeat_interval(Duration::from_millis(50)),
    )
}

#[test]
fn status_snapshots_the_directory() {
    let service = service();
    service.create_stream(Some("one".into()));
    service.create_stream(Some("two".into()));

    let status = service.status();
    assert_eq!(status.stream_count, 2);
    assert!(status.timestamp <= Utc::now());
}

#[test]
fn create_stream_generates_an_id_when_absent() {
    let service = service();
    let created = service.create_stream(None);
    assert!(!created.stream_id.is_empty());
    assert!(service.directory().get(&created.stream_id).is_some());
}

#[test]
fn create_stream_is_idempotent_per_id() {
    let service = service();
    let first = service.create_stream(Some("s1".into()));
    let second = service.create_stream(Some("s1".into()));
    assert_eq!(first, second);
    assert_eq!(service.directory().len(), 1);
}

#[test]
fn delete_stream_reports_found() {
    let service = service();
    service.create_stream(Some("s1".into()));

    assert!(service.delete_stream("s1").found);
    assert!(!service.delete_stream("s1").found);
    assert!(!service.delete_stream("never-created").found);
}

#[test]
fn publish_forces_client_source() {
    let service = service();
    service.create_stream(Some("s1".into()));
    let stream = service.directory().get("s1").expect("stream");
    let probe = CollectorListener::new();
    stream.add_listener(WILDCARD_CHANNEL, Arc::new(probe.clone()));

    let wire = json!({
        "id": "m-1",
        "channel": "chat",
        "source": "server",
        "data": "spoof attempt",
    });
    let accepted = service.publish("s1", &wire).expect("publish");
    assert_eq!(accepted.message_id, "m-1");

    let seen = probe.snapshot();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].source(), MessageSource::Client);
}

#[test]
fn publish_to_missing_stream_is_not_found() {
    let service = service();
    let result = service.publish("ghost", &json!({"channel": "chat", "data": "hi"}));
    match result {
        Err(ServiceError::StreamNotFound { stream_id }) => assert_eq!(stream_id, "ghost"),
        other => panic!("expected StreamNotFound, got {other:?}"),
    }
}

#[test]
fn publish_rejects_bad_source_tags() {
    let service = service();
    service.create_stream(Some("s1".into()));

    let result = service.publish("s1", &json!({"channel": "chat", "source": "gateway"}));
    assert!(matches!(
        result,
        Err(ServiceError::Message(MessageError::UnknownSource { .. }))
    ));
}

#[test]
fn send_forces_server_source() {
    let service = service();
    service.create_stream(Some("s1".into()));
    let stream = service.directory().get("s1").expect("stream");
    let probe = CollectorListener::new();
    stream.add_listener(WILDCARD_CHANNEL, Arc::new(probe.clone()));

    let accepted = service
        .send("s1", "alerts", json!({"level": "warn"}), FxHashMap::default())
        .expect("send");
    assert!(!accepted.message_id.is_empty());

    let seen = probe.snapshot();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].source(), MessageSource::Server);
    assert_eq!(seen[0].channel(), "alerts");
    assert_eq!(seen[0].id(), accepted.message_id);
}

#[test]
fn plain_poll_subscription_returns_an_empty_backlog() {
    let service = service();
    service.create_stream(Some("s1".into()));

    match service.subscribe("s1", false).expect("subscribe") {
        Subscription::Backlog(messages) => assert!(messages.is_empty()),
        Subscription::LongPoll(_) => panic!("expected a backlog subscription"),
    }
}

#[tokio::test]
async fn long_poll_subscription_receives_server_sends() {
    let service = service();
    service.create_stream(Some("s1".into()));

    let Subscription::LongPoll(mut adapter) = service.subscribe("s1", true).expect("subscribe")
    else {
        panic!("expected a long-poll subscription");
    };

    service
        .send("s1", "ticks", json!({"seq": 1}), FxHashMap::default())
        .expect("send");

    let frame = adapter.next_frame().await.expect("frame");
    let message = frame.message().expect("message frame");
    assert_eq!(message.channel(), "ticks");
    assert_eq!(message.data(), &json!({"seq": 1}));
}

#[test]
fn subscribe_to_missing_stream_is_not_found() {
    let service = service();
    assert!(matches!(
        service.subscribe("ghost", true),
        Err(ServiceError::StreamNotFound { .. })
    ));
}

#[test]
fn response_payloads_use_wire_names() {
    let service = service();
    let created = service.create_stream(Some("s1".into()));

    let status = serde_json::to_value(service.status()).expect("encode status");
    assert!(status.get("stream_count").is_some());
    assert!(status.get("timestamp").is_some());

    let created = serde_json::to_value(created).expect("encode created");
    assert_eq!(created, json!({"stream_id": "s1"}));

    let deleted = serde_json::to_value(service.delete_stream("s1")).expect("encode deleted");
    assert_eq!(deleted, json!({"found": true}));
}
