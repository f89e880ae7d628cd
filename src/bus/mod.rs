//! The stream bus core: queues, listener fan-out, and the stream directory.
//!
//! The module is organised around [`MessageStream`] (one conversation's FIFO
//! queue plus its listener registry), the [`MessageFeed`] competing-consumer
//! handle it hands out, the [`StreamListener`] capability interface with its
//! shipped implementations, and the process-wide [`StreamDirectory`].

pub mod directory;
pub mod feed;
pub mod listener;
pub mod stream;

pub use directory::StreamDirectory;
pub use feed::MessageFeed;
pub use listener::{ChannelListener, CollectorListener, StreamListener};
pub use stream::{MessageStream, StreamError, WILDCARD_CHANNEL};
