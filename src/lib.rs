//! # Streambus: Bidirectional Stream Message Bus
//!
//! Streambus lets independently-running clients and a server exchange typed,
//! channel-scoped messages asynchronously within one process: multiple
//! concurrent listeners per channel, competing queue consumers, and a
//! long-poll delivery mode with idle heartbeats.
//!
//! ## Core Concepts
//!
//! - **Messages**: Immutable units of communication with a fixed wire format
//! - **Streams**: Isolated conversation contexts holding a FIFO queue and a
//!   listener registry
//! - **Listeners**: Callbacks notified synchronously on every matching
//!   publish, including wildcard listeners that see every channel
//! - **Directory**: Process-wide stream lifecycle (create-on-demand,
//!   explicit delete)
//! - **Delivery**: Framed, heartbeat-augmented bridging of a stream to a
//!   long-lived consumer connection
//!
//! ## Quick Start
//!
//! ### Publishing and consuming
//!
//! ```
//! use streambus::bus::MessageStream;
//! use streambus::message::StreamMessage;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let stream = MessageStream::new();
//! let feed = stream.listen();
//!
//! stream.publish(StreamMessage::client("chat", json!("hi"))).unwrap();
//!
//! let message = feed.recv().await.unwrap();
//! assert_eq!(message.channel(), "chat");
//! # }
//! ```
//!
//! ### Fan-out to listeners
//!
//! ```
//! use std::sync::Arc;
//! use streambus::bus::{CollectorListener, MessageStream, WILDCARD_CHANNEL};
//! use serde_json::json;
//!
//! let stream = MessageStream::new();
//! let collector = CollectorListener::new();
//! stream.add_listener(WILDCARD_CHANNEL, Arc::new(collector.clone()));
//!
//! stream.send("alerts", json!({"level": "warn"})).unwrap();
//! assert_eq!(collector.snapshot().len(), 1);
//! ```
//!
//! ### Long-poll delivery with heartbeats
//!
//! ```no_run
//! use std::sync::Arc;
//! use streambus::bus::StreamDirectory;
//! use streambus::service::{StreamService, Subscription};
//!
//! #[tokio::main]
//! async fn main() {
//!     let service = StreamService::new(Arc::new(StreamDirectory::new()));
//!     service.create_stream(Some("s1".into()));
//!
//!     let Ok(Subscription::LongPoll(mut adapter)) = service.subscribe("s1", true) else {
//!         return;
//!     };
//!     while let Some(frame) = adapter.next_frame().await {
//!         println!("{}", frame.to_json_value());
//!     }
//! }
//! ```
//!
//! ## Module Guide
//!
//! - [`message`] - Message types and the fixed wire codec
//! - [`bus`] - Streams, listener fan-out, feeds, and the stream directory
//! - [`delivery`] - Long-poll delivery adapter and framed events
//! - [`service`] - The operation surface a transport mounts

pub mod bus;
pub mod delivery;
pub mod message;
pub mod service;
