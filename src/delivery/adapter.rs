use std::io::{self, Result as IoResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::stream::{self, Stream};
use tokio::sync::watch;
use tokio::time::timeout;

use super::frame::DeliveryFrame;
use crate::bus::listener::StreamListener;
use crate::bus::stream::{MessageStream, WILDCARD_CHANNEL};
use crate::message::StreamMessage;

/// Tuning for delivery adapters.
///
/// The heartbeat interval bounds how long a connection stays silent before a
/// keep-alive frame goes out. The buffer capacity bounds per-connection
/// memory: when a consumer falls this far behind, the newest message is
/// rejected and counted rather than queued.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryConfig {
    pub heartbeat_interval: Duration,
    pub buffer_capacity: usize,
}

impl DeliveryConfig {
    pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
    pub const DEFAULT_BUFFER_CAPACITY: usize = 256;

    #[must_use]
    pub fn new(heartbeat_interval: Duration, buffer_capacity: usize) -> Self {
        Self {
            heartbeat_interval,
            buffer_capacity: if buffer_capacity == 0 {
                Self::DEFAULT_BUFFER_CAPACITY
            } else {
                buffer_capacity
            },
        }
    }

    #[must_use]
    pub fn with_heartbeat_interval(mut self, heartbeat_interval: Duration) -> Self {
        self.heartbeat_interval = heartbeat_interval;
        self
    }

    #[must_use]
    pub fn with_buffer_capacity(self, buffer_capacity: usize) -> Self {
        Self::new(self.heartbeat_interval, buffer_capacity)
    }

    /// Resolve a config from the environment.
    ///
    /// Reads `STREAMBUS_HEARTBEAT_SECS` and `STREAMBUS_DELIVERY_BUFFER`
    /// after loading a `.env` file if one is present; unset or unparseable
    /// values fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let heartbeat_interval = std::env::var("STREAMBUS_HEARTBEAT_SECS")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Self::DEFAULT_HEARTBEAT_INTERVAL);
        let buffer_capacity = std::env::var("STREAMBUS_DELIVERY_BUFFER")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(Self::DEFAULT_BUFFER_CAPACITY);
        Self::new(heartbeat_interval, buffer_capacity)
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_HEARTBEAT_INTERVAL,
            Self::DEFAULT_BUFFER_CAPACITY,
        )
    }
}

/// Wildcard listener that feeds a delivery adapter's bounded buffer with
/// server-sourced traffic.
struct BufferListener {
    tx: flume::Sender<StreamMessage>,
    dropped: AtomicUsize,
}

impl StreamListener for BufferListener {
    fn notify(&self, message: &StreamMessage) -> IoResult<()> {
        if !message.source().is_server() {
            return Ok(());
        }
        match self.tx.try_send(message.clone()) {
            Ok(()) => Ok(()),
            Err(flume::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Err(io::Error::new(
                    io::ErrorKind::WouldBlock,
                    "delivery buffer full, message dropped",
                ))
            }
            Err(flume::TrySendError::Disconnected(_)) => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "delivery consumer detached",
            )),
        }
    }
}

/// Bridges one stream's server-sourced traffic to one remote consumer
/// connection as a sequence of framed events with idle heartbeats.
///
/// Attaching registers a wildcard listener on the stream; only messages
/// published after the attach are delivered (the stream's queue belongs to
/// [`listen`](MessageStream::listen) consumers and is never backfilled).
/// Dropping the adapter deregisters the listener, so cleanup runs on every
/// exit path, including task cancellation.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use streambus::bus::MessageStream;
/// use streambus::delivery::{DeliveryAdapter, DeliveryConfig};
///
/// #[tokio::main]
/// async fn main() {
///     let stream = Arc::new(MessageStream::new());
///     let mut adapter = DeliveryAdapter::attach(stream.clone(), DeliveryConfig::default());
///     while let Some(frame) = adapter.next_frame().await {
///         println!("{}", frame.to_json_value());
///     }
///     // None: the stream was deleted, the connection is done.
/// }
/// ```
pub struct DeliveryAdapter {
    stream: Arc<MessageStream>,
    listener: Arc<BufferListener>,
    buffer: flume::Receiver<StreamMessage>,
    closed: watch::Receiver<bool>,
    heartbeat_interval: Duration,
}

impl DeliveryAdapter {
    /// Attach a fresh connection to `stream`.
    pub fn attach(stream: Arc<MessageStream>, config: DeliveryConfig) -> Self {
        let (tx, buffer) = flume::bounded(config.buffer_capacity);
        let listener = Arc::new(BufferListener {
            tx,
            dropped: AtomicUsize::new(0),
        });
        stream.add_listener(WILDCARD_CHANNEL, listener.clone() as Arc<dyn StreamListener>);
        let closed = stream.closed_signal();
        tracing::debug!(
            heartbeat_ms = config.heartbeat_interval.as_millis() as u64,
            buffer_capacity = config.buffer_capacity,
            "delivery adapter attached"
        );
        Self {
            stream,
            listener,
            buffer,
            closed,
            heartbeat_interval: config.heartbeat_interval,
        }
    }

    /// Wait for the next frame.
    ///
    /// Yields a message frame as soon as one is buffered, a heartbeat frame
    /// after an idle heartbeat interval, and `None` (terminal) once the
    /// stream has been closed or deleted.
    pub async fn next_frame(&mut self) -> Option<DeliveryFrame> {
        if *self.closed.borrow() {
            return None;
        }
        tokio::select! {
            _ = self.closed.changed() => None,
            outcome = timeout(self.heartbeat_interval, self.buffer.recv_async()) => {
                match outcome {
                    Ok(Ok(message)) => Some(DeliveryFrame::Message(message)),
                    Ok(Err(_)) => None,
                    Err(_) => Some(DeliveryFrame::Heartbeat),
                }
            }
        }
    }

    /// Messages rejected because the connection's buffer was full.
    pub fn dropped(&self) -> usize {
        self.listener.dropped.load(Ordering::Relaxed)
    }

    /// Convert into an async stream of frames, ending when the connection
    /// terminates. The listener is deregistered when the stream is dropped.
    pub fn into_frame_stream(self) -> impl Stream<Item = DeliveryFrame> {
        stream::unfold(self, |mut adapter| async move {
            adapter.next_frame().await.map(|frame| (frame, adapter))
        })
    }
}

impl Drop for DeliveryAdapter {
    fn drop(&mut self) {
        let listener = self.listener.clone() as Arc<dyn StreamListener>;
        self.stream.remove_listener(WILDCARD_CHANNEL, &listener);
        tracing::debug!(dropped = self.dropped(), "delivery adapter detached");
    }
}
