use std::time::Duration;

use futures_util::stream::{self, Stream};
use tokio::time::timeout;

use crate::message::StreamMessage;

/// A competing-consumer handle on a stream's queue.
///
/// Created by [`MessageStream::listen`](super::MessageStream::listen).
/// Feeds over the same stream share one queue: each queued message is drawn
/// by exactly one feed, in publish order. This is distinct from the
/// broadcast fan-out performed by registered listeners.
///
/// Dropping a feed needs no cleanup; queue consumption has no registration
/// step, so cancellation is just letting the feed go.
pub struct MessageFeed {
    receiver: flume::Receiver<StreamMessage>,
}

impl MessageFeed {
    pub(crate) fn new(receiver: flume::Receiver<StreamMessage>) -> Self {
        Self { receiver }
    }

    /// Receive the next message, suspending until one is available.
    ///
    /// Returns `Err(RecvError::Disconnected)` once the stream has been
    /// closed and the queue drained.
    pub async fn recv(&self) -> Result<StreamMessage, flume::RecvError> {
        self.receiver.recv_async().await
    }

    /// Try to draw a message without suspending.
    pub fn try_recv(&self) -> Result<StreamMessage, flume::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Wait up to `duration` for the next message.
    ///
    /// Returns `None` on timeout or once the stream is closed and drained.
    pub async fn next_timeout(&self, duration: Duration) -> Option<StreamMessage> {
        match timeout(duration, self.receiver.recv_async()).await {
            Ok(Ok(message)) => Some(message),
            Ok(Err(_)) | Err(_) => None,
        }
    }

    /// Messages queued and not yet drawn by any feed on this stream.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Convert into an async stream of messages, ending when the stream is
    /// closed and drained.
    pub fn into_async_stream(self) -> impl Stream<Item = StreamMessage> {
        stream::unfold(self, |feed| async move {
            match feed.receiver.recv_async().await {
                Ok(message) => Some((message, feed)),
                Err(_) => None,
            }
        })
    }
}
