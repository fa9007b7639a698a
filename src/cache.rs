//! Bounded time-to-live cache.
//!
//! A thin wrapper over `moka::future::Cache` with the three operations the
//! vault needs: get, insert and invalidate. Entries disappear after the TTL
//! or when the capacity bound evicts them, whichever comes first.

use moka::future::Cache;
use std::hash::Hash;
use std::time::Duration;

#[derive(Clone)]
pub struct TtlCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Cache<K, V>,
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key).await
    }

    pub async fn insert(&self, key: K, value: V) {
        self.inner.insert(key, value).await;
    }

    pub async fn invalidate(&self, key: &K) {
        self.inner.invalidate(key).await;
    }
}

/// OCR transcriptions keyed by the SHA-256 of the normalised image.
pub type OcrCache = TtlCache<[u8; 32], String>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_insert_invalidate() {
        let cache: TtlCache<String, u32> = TtlCache::new(8, Duration::from_secs(60));
        assert_eq!(cache.get(&"a".to_string()).await, None);

        cache.insert("a".to_string(), 1).await;
        assert_eq!(cache.get(&"a".to_string()).await, Some(1));

        cache.invalidate(&"a".to_string()).await;
        assert_eq!(cache.get(&"a".to_string()).await, None);
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache: TtlCache<u8, &'static str> = TtlCache::new(8, Duration::from_millis(50));
        cache.insert(1, "text").await;
        assert_eq!(cache.get(&1).await, Some("text"));

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(cache.get(&1).await, None);
    }
}
