//! Result caches for cacheable SELECT statements.
//!
//! A namespace owns one cache per cacheable statement. Keys are derived from
//! the parameter value, values are the raw rows the statement returned, so a
//! hit is rebound into fresh records.

pub mod fifo;
mod flush;
pub mod generational;

pub use fifo::FifoCache;
pub use generational::{GENERATION, GenerationalCache};

use crate::config::{CacheConfig, EvictionPolicy};
use crate::error::MapperResult;
use crate::models::Row;
use std::hash::Hash;
use std::sync::Arc;

/// A bounded key/value store shared between sessions.
pub trait Cache<K, V>: Send + Sync {
    /// Insert or overwrite.
    fn set(&self, key: K, value: V);

    fn get(&self, key: &K) -> Option<V>;

    /// Drop every entry.
    fn flush(&self);

    fn len(&self) -> usize;

    fn capacity(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cache key: the statement parameter rendered canonically.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(rendered: impl Into<String>) -> Self {
        Self(rendered.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Rows as returned by the database, shared between cache and readers.
pub type CachedRows = Arc<Vec<Row>>;

/// The cache type held per cacheable statement.
pub type StatementCache = Arc<dyn Cache<CacheKey, CachedRows>>;

/// Build a cache for `config` with its TTL flush timer attached.
///
/// Must be called from within a tokio runtime. Fails when the configured TTL
/// is zero.
pub fn build_cache<K, V>(config: &CacheConfig) -> MapperResult<Arc<dyn Cache<K, V>>>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let capacity = config.capacity_or_default();
    let ttl = config.ttl_or_default();
    Ok(match config.eviction_policy {
        EvictionPolicy::Fifo => Arc::new(FifoCache::with_ttl(capacity, ttl)?),
        EvictionPolicy::Lru => Arc::new(GenerationalCache::with_ttl(capacity, ttl)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_build_cache_honours_policy() {
        let ttl = Duration::from_secs(3600);
        let fifo: Arc<dyn Cache<u32, u32>> =
            build_cache(&CacheConfig::new(EvictionPolicy::Fifo, 2, ttl)).unwrap();
        fifo.set(1, 1);
        fifo.set(2, 2);
        fifo.get(&1);
        fifo.set(3, 3);
        assert_eq!(fifo.get(&1), None);
        assert_eq!(fifo.capacity(), 2);

        let lru: Arc<dyn Cache<u32, u32>> =
            build_cache(&CacheConfig::new(EvictionPolicy::Lru, 2, ttl)).unwrap();
        lru.set(1, 1);
        lru.set(2, 2);
        lru.get(&1);
        lru.set(3, 3);
        assert_eq!(lru.get(&1), Some(1));
        assert_eq!(lru.get(&2), None);
    }

    #[tokio::test]
    async fn test_build_cache_rejects_zero_ttl() {
        for policy in [EvictionPolicy::Fifo, EvictionPolicy::Lru] {
            let result: MapperResult<Arc<dyn Cache<u32, u32>>> =
                build_cache(&CacheConfig::new(policy, 2, Duration::ZERO));
            assert!(result.is_err());
        }
    }

    #[test]
    fn test_cache_key_equality() {
        assert_eq!(CacheKey::new("542"), CacheKey::new("542".to_string()));
        assert_ne!(CacheKey::new("542"), CacheKey::new("\"542\""));
    }
}
