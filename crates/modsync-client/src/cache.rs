//! Short-lived response cache using the moka crate.

use std::time::Duration;

use bytes::Bytes;
use moka::future::Cache;
use tracing::debug;

/// Process-local cache of successful JSON response bodies.
///
/// Entries expire after a fixed TTL and are dropped lazily on lookup.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    entries: Cache<String, Bytes>,
}

impl ResponseCache {
    /// Create a cache with a fixed entry lifetime and capacity.
    pub fn new(ttl: Duration, max_entries: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        Self { entries }
    }

    /// Look up a fresh entry.
    pub async fn get(&self, key: &str) -> Option<Bytes> {
        let hit = self.entries.get(key).await;
        if hit.is_some() {
            debug!(key, "Catalog cache hit");
        }
        hit
    }

    /// Store a response body.
    pub async fn insert(&self, key: String, body: Bytes) {
        self.entries.insert(key, body).await;
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        let cache = ResponseCache::new(Duration::from_millis(100), 16);
        cache
            .insert("GET https://catalog.test/a".into(), Bytes::from_static(b"{}"))
            .await;

        assert_eq!(
            cache.get("GET https://catalog.test/a").await,
            Some(Bytes::from_static(b"{}"))
        );

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(cache.get("GET https://catalog.test/a").await.is_none());
    }

    #[tokio::test]
    async fn test_clear_drops_entries() {
        let cache = ResponseCache::new(Duration::from_secs(60), 16);
        cache.insert("k".into(), Bytes::from_static(b"1")).await;
        cache.clear();
        assert!(cache.get("k").await.is_none());
    }
}
