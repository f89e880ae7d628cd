//! Demonstrates the delivery buffer's overflow policy.
//!
//! This example shows:
//! - How a slow long-poll consumer overruns its bounded buffer
//! - The reject-newest drop policy and the per-adapter drop counter
//! - Heartbeats taking over once the buffer is drained

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use streambus::bus::MessageStream;
use streambus::delivery::{DeliveryAdapter, DeliveryConfig};

#[tokio::main]
async fn main() {
    // Tiny buffer so the flood overruns it immediately.
    let stream = Arc::new(MessageStream::new());
    let config = DeliveryConfig::default()
        .with_buffer_capacity(2)
        .with_heartbeat_interval(Duration::from_millis(50));
    let mut adapter = DeliveryAdapter::attach(stream.clone(), config);

    // Flood the stream while the consumer is not draining.
    for i in 0..100 {
        stream.send("flood", json!({"seq": i})).ok();
    }

    // Drain what survived; the first heartbeat means the buffer is empty.
    while let Some(frame) = adapter.next_frame().await {
        if frame.is_heartbeat() {
            break;
        }
        println!("Received: {}", frame.to_json_value());
    }

    println!("Total dropped: {}", adapter.dropped());
}
