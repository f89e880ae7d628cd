use std::io::{self, Result as IoResult};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::message::StreamMessage;

/// Capability interface for out-of-band message consumers.
///
/// A listener registered on a channel (or the wildcard key) is invoked
/// synchronously on the publishing execution context for every matching
/// publish. Implementations must be lightweight; anything slow should hand
/// the message off to another task, as [`ChannelListener`] does.
///
/// A returned error is caught and logged by the stream and never reaches the
/// publisher or the other listeners.
pub trait StreamListener: Send + Sync {
    /// Handle one published message.
    fn notify(&self, message: &StreamMessage) -> IoResult<()>;
}

/// Listener that forwards messages to an async consumer via a tokio channel.
///
/// The send never blocks. If the receiving half is gone the listener reports
/// `BrokenPipe`, which the stream logs and otherwise ignores.
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<StreamMessage>,
}

impl ChannelListener {
    /// Create a listener forwarding into `tx`.
    ///
    /// # Example
    /// ```no_run
    /// use std::sync::Arc;
    /// use tokio::sync::mpsc;
    /// use streambus::bus::{ChannelListener, MessageStream, WILDCARD_CHANNEL};
    ///
    /// let stream = MessageStream::new();
    /// let (tx, mut rx) = mpsc::unbounded_channel();
    /// stream.add_listener(WILDCARD_CHANNEL, Arc::new(ChannelListener::new(tx)));
    ///
    /// // In another task, consume messages:
    /// tokio::spawn(async move {
    ///     while let Some(message) = rx.recv().await {
    ///         println!("received on {}", message.channel());
    ///     }
    /// });
    /// ```
    pub fn new(tx: mpsc::UnboundedSender<StreamMessage>) -> Self {
        Self { tx }
    }
}

impl StreamListener for ChannelListener {
    fn notify(&self, message: &StreamMessage) -> IoResult<()> {
        self.tx
            .send(message.clone())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "channel receiver dropped"))
    }
}

/// In-memory listener for tests and snapshots.
///
/// Clones share the same backing store, so keep one clone for assertions and
/// register the other.
#[derive(Clone, Default)]
pub struct CollectorListener {
    entries: Arc<Mutex<Vec<StreamMessage>>>,
}

impl CollectorListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of all captured messages.
    pub fn snapshot(&self) -> Vec<StreamMessage> {
        self.entries.lock().expect("collector poisoned").clone()
    }

    /// Clear all captured messages.
    pub fn clear(&self) {
        self.entries.lock().expect("collector poisoned").clear();
    }
}

impl StreamListener for CollectorListener {
    fn notify(&self, message: &StreamMessage) -> IoResult<()> {
        self.entries
            .lock()
            .expect("collector poisoned")
            .push(message.clone());
        Ok(())
    }
}
