use std::sync::Arc;

use serde_json::json;
use streambus::bus::StreamDirectory;
use streambus::message::StreamMessage;

#[test]
fn get_or_create_returns_the_same_instance() {
    let directory = StreamDirectory::new();
    let first = directory.get_or_create("abc");
    let second = directory.get_or_create("abc");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(directory.len(), 1);
}

#[tokio::test]
async fn concurrent_get_or_create_never_duplicates() {
    let directory = Arc::new(StreamDirectory::new());

    let mut handles = Vec::new();
    for _ in 0..16 {
        let directory = directory.clone();
        handles.push(tokio::spawn(
            async move { directory.get_or_create("abc") },
        ));
    }

    let mut streams = Vec::new();
    for handle in handles {
        streams.push(handle.await.expect("join"));
    }

    for stream in &streams {
        assert!(Arc::ptr_eq(stream, &streams[0]));
    }
    assert_eq!(directory.len(), 1);
}

#[test]
fn delete_reports_whether_a_stream_was_removed() {
    let directory = StreamDirectory::new();
    directory.get_or_create("abc");

    assert!(directory.delete("abc"));
    assert!(!directory.delete("abc"));
    assert!(!directory.delete("never-existed"));
    assert!(directory.is_empty());
}

#[test]
fn recreate_after_delete_yields_a_fresh_empty_stream() {
    let directory = StreamDirectory::new();
    let original = directory.get_or_create("abc");
    original
        .publish(StreamMessage::server("chat", json!("leftover")))
        .expect("publish");

    assert!(directory.delete("abc"));
    let recreated = directory.get_or_create("abc");

    assert!(!Arc::ptr_eq(&original, &recreated));
    assert_eq!(recreated.queued(), 0);
    assert!(!recreated.is_closed());
    recreated
        .publish(StreamMessage::server("chat", json!("fresh")))
        .expect("publish on recreated stream");
}

#[tokio::test]
async fn deletion_disconnects_in_flight_feeds() {
    let directory = Arc::new(StreamDirectory::new());
    let stream = directory.get_or_create("abc");
    let feed = stream.listen();

    let consumer = tokio::spawn(async move { feed.recv().await });

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert!(directory.delete("abc"));

    let outcome = consumer.await.expect("join");
    assert!(outcome.is_err(), "feed should observe the disconnect");
}

#[test]
fn clear_closes_every_stream() {
    let directory = StreamDirectory::new();
    let first = directory.get_or_create("one");
    let second = directory.get_or_create("two");

    directory.clear();

    assert!(directory.is_empty());
    assert!(first.is_closed());
    assert!(second.is_closed());
}

#[test]
fn get_does_not_create() {
    let directory = StreamDirectory::new();
    assert!(directory.get("missing").is_none());
    assert!(directory.is_empty());
}
