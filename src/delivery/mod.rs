//! Long-poll / push delivery: framed events with idle heartbeats.
//!
//! A [`DeliveryAdapter`] bridges one stream's server-sourced traffic to one
//! remote consumer connection. The connection protocol is
//! `CONNECTED → (message | heartbeat)* → DISCONNECTED`: frames are emitted
//! as messages arrive, a [`DeliveryFrame::Heartbeat`] goes out after each
//! idle interval, and the sequence ends only on disconnect or stream
//! deletion. There is no resume: a new connection starts a fresh listener
//! registration and sees only traffic published after it attaches.

pub mod adapter;
pub mod frame;

pub use adapter::{DeliveryAdapter, DeliveryConfig};
pub use frame::DeliveryFrame;
