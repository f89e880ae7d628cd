use std::sync::{Arc, Mutex};

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;

use super::feed::MessageFeed;
use super::listener::StreamListener;
use crate::message::StreamMessage;

/// Channel key matching every channel on a stream.
pub const WILDCARD_CHANNEL: &str = "*";

/// Errors returned by stream operations.
#[derive(Debug, Error, Diagnostic)]
pub enum StreamError {
    /// The stream was closed (deleted from its directory); the message was
    /// not enqueued and no listeners ran.
    #[error("stream is closed")]
    #[diagnostic(code(streambus::stream::closed))]
    Closed,
}

/// One isolated conversation context: a FIFO message queue plus a registry of
/// channel-scoped listeners.
///
/// Publishing enqueues the message and then fans it out synchronously to the
/// listeners registered for its channel and for [`WILDCARD_CHANNEL`], before
/// `publish` returns. Queue consumption via [`MessageStream::listen`] is a
/// separate, competing-consumers path: each queued message is drawn by
/// exactly one feed, in publish order.
///
/// All shared state is synchronized internally; callers never manage locks.
pub struct MessageStream {
    sender: Mutex<Option<flume::Sender<StreamMessage>>>,
    receiver: flume::Receiver<StreamMessage>,
    listeners: Mutex<FxHashMap<String, Vec<Arc<dyn StreamListener>>>>,
    closed: watch::Sender<bool>,
}

impl Default for MessageStream {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageStream {
    pub fn new() -> Self {
        let (tx, rx) = flume::unbounded();
        let (closed, _) = watch::channel(false);
        Self {
            sender: Mutex::new(Some(tx)),
            receiver: rx,
            listeners: Mutex::new(FxHashMap::default()),
            closed,
        }
    }

    /// Publish a message to the stream.
    ///
    /// Appends the message to the queue (unbounded, so this never blocks)
    /// and invokes every listener registered for the message's channel plus
    /// every wildcard listener before returning. A listener error is logged
    /// and does not stop the remaining listeners or fail the publish.
    pub fn publish(&self, message: StreamMessage) -> Result<(), StreamError> {
        let tx = {
            let guard = self.sender.lock().expect("stream sender poisoned");
            guard.as_ref().cloned()
        };
        let Some(tx) = tx else {
            return Err(StreamError::Closed);
        };
        tx.send(message.clone()).map_err(|_| StreamError::Closed)?;
        self.notify_listeners(&message);
        Ok(())
    }

    /// Build and publish a server-sourced message with a fresh id.
    ///
    /// Returns the published message so callers can report its id.
    pub fn send(&self, channel: impl Into<String>, data: Value) -> Result<StreamMessage, StreamError> {
        let message = StreamMessage::server(channel, data);
        self.publish(message.clone())?;
        Ok(message)
    }

    /// Register a listener under a channel (or [`WILDCARD_CHANNEL`]).
    ///
    /// Idempotent: registering the same `Arc` twice under the same channel
    /// has no additional effect. Listener identity is the `Arc` allocation.
    /// Registration on a closed stream is a no-op.
    pub fn add_listener(&self, channel: impl Into<String>, listener: Arc<dyn StreamListener>) {
        if *self.closed.borrow() {
            return;
        }
        let mut guard = self.listeners.lock().expect("listener registry poisoned");
        let entry = guard.entry(channel.into()).or_default();
        if !entry.iter().any(|existing| Arc::ptr_eq(existing, &listener)) {
            entry.push(listener);
        }
    }

    /// Unregister a listener; no-op if it was never registered.
    pub fn remove_listener(&self, channel: &str, listener: &Arc<dyn StreamListener>) {
        let mut guard = self.listeners.lock().expect("listener registry poisoned");
        let emptied = match guard.get_mut(channel) {
            Some(entry) => {
                entry.retain(|existing| !Arc::ptr_eq(existing, listener));
                entry.is_empty()
            }
            None => false,
        };
        if emptied {
            guard.remove(channel);
        }
    }

    /// Number of listeners currently registered under a channel.
    pub fn listener_count(&self, channel: &str) -> usize {
        self.listeners
            .lock()
            .expect("listener registry poisoned")
            .get(channel)
            .map_or(0, Vec::len)
    }

    /// Open an independent competing-consumer handle on the queue.
    ///
    /// Every feed draws from the same shared queue: a queued message is
    /// delivered to exactly one feed, in strict publish order. Each pull
    /// suspends until a message is available; there is no busy-waiting.
    pub fn listen(&self) -> MessageFeed {
        MessageFeed::new(self.receiver.clone())
    }

    /// Messages currently queued and not yet drawn by any feed.
    pub fn queued(&self) -> usize {
        self.receiver.len()
    }

    /// Whether [`MessageStream::close`] has run.
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Close the stream: drop the producer side, discard queued messages,
    /// and clear the listener registry.
    ///
    /// In-flight feeds observe the disconnect once the queue is empty, and
    /// attached delivery adapters terminate promptly. Idempotent.
    pub fn close(&self) {
        {
            let mut guard = self.sender.lock().expect("stream sender poisoned");
            if guard.take().is_none() {
                return;
            }
        }
        while self.receiver.try_recv().is_ok() {}
        self.listeners
            .lock()
            .expect("listener registry poisoned")
            .clear();
        self.closed.send_replace(true);
        tracing::debug!("stream closed");
    }

    pub(crate) fn closed_signal(&self) -> watch::Receiver<bool> {
        self.closed.subscribe()
    }

    fn notify_listeners(&self, message: &StreamMessage) {
        // Snapshot the matching listeners so callbacks run outside the lock
        // and may re-enter add/remove without deadlocking.
        let targets: Vec<Arc<dyn StreamListener>> = {
            let guard = self.listeners.lock().expect("listener registry poisoned");
            let mut targets = Vec::new();
            if let Some(list) = guard.get(message.channel()) {
                targets.extend(list.iter().cloned());
            }
            if message.channel() != WILDCARD_CHANNEL {
                if let Some(list) = guard.get(WILDCARD_CHANNEL) {
                    targets.extend(list.iter().cloned());
                }
            }
            targets
        };

        for listener in targets {
            if let Err(error) = listener.notify(message) {
                tracing::warn!(
                    channel = %message.channel(),
                    message_id = %message.id(),
                    %error,
                    "stream listener failed"
                );
            }
        }
    }
}
