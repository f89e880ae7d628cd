use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;

use super::stream::MessageStream;

/// Process-wide mapping from stream identifier to [`MessageStream`].
///
/// Explicitly constructed and injectable rather than a global singleton, so
/// tests and embedders can run independent directories side by side.
/// Construct one at process start and [`clear`](Self::clear) it at shutdown.
///
/// # Examples
///
/// ```
/// use streambus::bus::StreamDirectory;
///
/// let directory = StreamDirectory::new();
/// let stream = directory.get_or_create("s1");
/// assert!(std::sync::Arc::ptr_eq(&stream, &directory.get_or_create("s1")));
/// assert!(directory.delete("s1"));
/// assert!(!directory.delete("s1"));
/// ```
#[derive(Default)]
pub struct StreamDirectory {
    streams: Mutex<FxHashMap<String, Arc<MessageStream>>>,
}

impl StreamDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the stream registered under `stream_id`, creating it first if
    /// absent.
    ///
    /// First creation wins: concurrent calls with the same id always observe
    /// the same instance.
    pub fn get_or_create(&self, stream_id: impl Into<String>) -> Arc<MessageStream> {
        let mut guard = self.streams.lock().expect("stream directory poisoned");
        guard
            .entry(stream_id.into())
            .or_insert_with(|| Arc::new(MessageStream::new()))
            .clone()
    }

    /// Look up a stream without creating it.
    pub fn get(&self, stream_id: &str) -> Option<Arc<MessageStream>> {
        self.streams
            .lock()
            .expect("stream directory poisoned")
            .get(stream_id)
            .cloned()
    }

    /// Remove and close the stream registered under `stream_id`.
    ///
    /// Returns whether a stream was actually removed. Closing discards the
    /// queued messages and listeners; in-flight consumers observe the
    /// disconnect.
    pub fn delete(&self, stream_id: &str) -> bool {
        let removed = self
            .streams
            .lock()
            .expect("stream directory poisoned")
            .remove(stream_id);
        match removed {
            Some(stream) => {
                stream.close();
                tracing::debug!(stream_id, "stream deleted");
                true
            }
            None => false,
        }
    }

    /// Number of registered streams.
    pub fn len(&self) -> usize {
        self.streams.lock().expect("stream directory poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close and drop every registered stream. Shutdown path.
    pub fn clear(&self) {
        let drained: Vec<Arc<MessageStream>> = {
            let mut guard = self.streams.lock().expect("stream directory poisoned");
            guard.drain().map(|(_, stream)| stream).collect()
        };
        for stream in drained {
            stream.close();
        }
    }
}
