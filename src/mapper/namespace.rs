//! Per-namespace cache set.

use crate::cache::{StatementCache, build_cache};
use crate::config::MapperConfig;
use crate::error::MapperResult;
use std::collections::HashMap;
use tracing::debug;

/// The caches of one repository contract: one per cacheable statement.
pub struct Namespace {
    name: String,
    caches: HashMap<String, StatementCache>,
}

impl Namespace {
    /// Build the caches a mapper configuration asks for.
    ///
    /// Must be called from within a tokio runtime when any statement is
    /// cacheable, since every cache carries a TTL timer.
    pub fn from_config(mapper: &MapperConfig) -> MapperResult<Self> {
        let mut caches: HashMap<String, StatementCache> = HashMap::new();
        if let Some(cache_config) = &mapper.cache {
            for statement in mapper.statements.iter().filter(|s| s.is_cacheable()) {
                caches.insert(statement.id.clone(), build_cache(cache_config)?);
            }
        }
        Ok(Self {
            name: mapper.namespace.clone(),
            caches,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cache of a cacheable statement, by bare statement id.
    pub fn cache(&self, statement_id: &str) -> Option<&StatementCache> {
        self.caches.get(statement_id)
    }

    pub fn cache_count(&self) -> usize {
        self.caches.len()
    }

    /// Clear every cache of this namespace.
    pub fn flush_caches(&self) {
        for cache in self.caches.values() {
            cache.flush();
        }
        debug!(namespace = %self.name, caches = self.caches.len(), "Flushed namespace caches");
    }
}

impl std::fmt::Debug for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Namespace")
            .field("name", &self.name)
            .field("cached_statements", &self.caches.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKey;
    use crate::config::{CacheConfig, EvictionPolicy};
    use crate::statement::StatementDescriptor;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_caches_only_for_cacheable_statements() {
        let mapper = MapperConfig::new("EmployeeMapper")
            .with_cache(CacheConfig::new(EvictionPolicy::Lru, 16, Duration::from_secs(60)))
            .with_statement(
                StatementDescriptor::select("getAllEmployees", "SELECT * FROM EMPLOYEES").cacheable(),
            )
            .with_statement(StatementDescriptor::select("countEmployees", "SELECT COUNT(*) FROM EMPLOYEES"));
        let namespace = Namespace::from_config(&mapper).unwrap();

        assert_eq!(namespace.cache_count(), 1);
        assert!(namespace.cache("getAllEmployees").is_some());
        assert!(namespace.cache("countEmployees").is_none());

        let cache = namespace.cache("getAllEmployees").unwrap();
        cache.set(CacheKey::new("()"), Arc::new(Vec::new()));
        namespace.flush_caches();
        assert!(cache.is_empty());
    }
}
