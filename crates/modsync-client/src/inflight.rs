//! Registry of in-flight shareable requests.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use bytes::Bytes;
use futures::future::{BoxFuture, Shared};

use crate::error::RemoteError;

/// Pending result handle cloned to every caller of the same request.
pub(crate) type Flight = Shared<BoxFuture<'static, Result<Bytes, RemoteError>>>;

/// Keyed map of pending results; the first caller for a key starts the
/// work and later callers attach to it.
#[derive(Default)]
pub(crate) struct InFlight {
    pending: Mutex<HashMap<String, Flight>>,
}

impl InFlight {
    /// Return the pending flight for `key`, or register the one produced by
    /// `start`. The flag is `true` when an existing flight was joined.
    pub(crate) fn join_or_start<F>(&self, key: &str, start: F) -> (Flight, bool)
    where
        F: FnOnce() -> Flight,
    {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(flight) = pending.get(key) {
            return (flight.clone(), true);
        }
        let flight = start();
        pending.insert(key.to_string(), flight.clone());
        (flight, false)
    }

    /// Forget the flight for `key` once its result is known.
    pub(crate) fn finish(&self, key: &str) {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl fmt::Debug for InFlight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InFlight")
            .field("pending", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    #[tokio::test]
    async fn test_second_caller_joins_first_flight() {
        let inflight = InFlight::default();
        let (first, joined) = inflight.join_or_start("k", || {
            async { Ok(Bytes::from_static(b"one")) }.boxed().shared()
        });
        assert!(!joined);

        let (second, joined) =
            inflight.join_or_start("k", || async { Ok(Bytes::from_static(b"two")) }.boxed().shared());
        assert!(joined);

        assert_eq!(first.await.unwrap(), Bytes::from_static(b"one"));
        assert_eq!(second.await.unwrap(), Bytes::from_static(b"one"));

        inflight.finish("k");
        assert_eq!(inflight.len(), 0);
    }
}
