//! Configuration consumed by the runtime.
//!
//! Parsing XML mapper files or property files is left to the caller; this
//! module holds the resolved form: environments with their connection
//! parameters, and namespaces with their statement descriptors, result maps
//! and cache settings. Everything derives `Deserialize` so a resolved
//! configuration can also be supplied as JSON.

use crate::db::ConnectionParams;
use crate::error::{MapperError, MapperResult};
use crate::statement::{ResultMap, StatementDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

// Pool configuration defaults
pub const DEFAULT_POOL_SIZE: usize = 10;
pub const DEFAULT_KEEP_ALIVE_SECS: u64 = 600;
pub const DEFAULT_LEAK_TIMEOUT_SECS: u64 = 1800;

// Cache configuration defaults
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

pub const DEFAULT_LOG_LEVEL: &str = "info";

fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Connection pool options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum live connections (default: 10)
    pub pool_size: Option<usize>,
    /// Delay between keep-alive probes in milliseconds (default: 600s)
    pub keep_alive_ms: Option<u64>,
    /// How long a connection may stay leased before it counts as leaked,
    /// in milliseconds (default: 1800s)
    pub leak_timeout_ms: Option<u64>,
}

impl PoolConfig {
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = Some(pool_size);
        self
    }

    pub fn with_keep_alive(mut self, interval: Duration) -> Self {
        self.keep_alive_ms = Some(duration_to_millis(interval));
        self
    }

    pub fn with_leak_timeout(mut self, window: Duration) -> Self {
        self.leak_timeout_ms = Some(duration_to_millis(window));
        self
    }

    pub fn pool_size_or_default(&self) -> usize {
        self.pool_size.unwrap_or(DEFAULT_POOL_SIZE)
    }

    pub fn keep_alive_or_default(&self) -> Duration {
        self.keep_alive_ms
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_secs(DEFAULT_KEEP_ALIVE_SECS))
    }

    pub fn leak_timeout_or_default(&self) -> Duration {
        self.leak_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_secs(DEFAULT_LEAK_TIMEOUT_SECS))
    }

    /// Validate pool options and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.pool_size == Some(0) {
            return Err("pool_size must be greater than 0".to_string());
        }
        if self.keep_alive_ms == Some(0) {
            return Err("keep_alive_ms must be greater than 0".to_string());
        }
        if self.leak_timeout_ms == Some(0) {
            return Err("leak_timeout_ms must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// How sessions obtain physical connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataSourceKind {
    /// Connections come from a bounded [`ConnectionPool`](crate::db::ConnectionPool).
    #[default]
    Pooled,
    /// A fresh connection is opened for every statement and closed afterwards.
    Unpooled,
}

impl std::fmt::Display for DataSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pooled => write!(f, "POOLED"),
            Self::Unpooled => write!(f, "UNPOOLED"),
        }
    }
}

/// One named database environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub id: String,
    #[serde(default)]
    pub data_source: DataSourceKind,
    pub connection: ConnectionParams,
    #[serde(default)]
    pub pool: PoolConfig,
}

impl EnvironmentConfig {
    pub fn new(id: impl Into<String>, connection: ConnectionParams) -> Self {
        Self {
            id: id.into(),
            data_source: DataSourceKind::Pooled,
            connection,
            pool: PoolConfig::default(),
        }
    }

    pub fn unpooled(mut self) -> Self {
        self.data_source = DataSourceKind::Unpooled;
        self
    }

    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }
}

/// Eviction policy for a namespace's statement caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EvictionPolicy {
    /// Insertion order, oldest evicted first.
    #[serde(rename = "FIFO")]
    Fifo,
    /// Generational read counting that approximates least-recently-used.
    #[default]
    #[serde(rename = "LRU")]
    Lru,
}

impl std::fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fifo => write!(f, "FIFO"),
            Self::Lru => write!(f, "LRU"),
        }
    }
}

impl std::str::FromStr for EvictionPolicy {
    type Err = MapperError;

    fn from_str(s: &str) -> MapperResult<Self> {
        match s.to_ascii_uppercase().as_str() {
            "FIFO" => Ok(Self::Fifo),
            "LRU" => Ok(Self::Lru),
            other => Err(MapperError::configuration(format!(
                "Unknown eviction policy '{}', expected FIFO or LRU",
                other
            ))),
        }
    }
}

/// Cache settings shared by every cacheable statement of a namespace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub eviction_policy: EvictionPolicy,
    /// Maximum entries per statement cache (default: 1024)
    pub capacity: Option<usize>,
    /// Interval between full flushes in milliseconds (default: 3600s)
    pub ttl_ms: Option<u64>,
}

impl CacheConfig {
    pub fn new(eviction_policy: EvictionPolicy, capacity: usize, ttl: Duration) -> Self {
        Self {
            eviction_policy,
            capacity: Some(capacity),
            ttl_ms: Some(duration_to_millis(ttl)),
        }
    }

    pub fn capacity_or_default(&self) -> usize {
        self.capacity.unwrap_or(DEFAULT_CACHE_CAPACITY)
    }

    pub fn ttl_or_default(&self) -> Duration {
        self.ttl_ms
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_secs(DEFAULT_CACHE_TTL_SECS))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.capacity == Some(0) {
            return Err("cache capacity must be greater than 0".to_string());
        }
        if self.ttl_ms == Some(0) {
            return Err("cache ttl_ms must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Statements, result maps and cache settings of one repository contract.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapperConfig {
    pub namespace: String,
    #[serde(default)]
    pub cache: Option<CacheConfig>,
    #[serde(default)]
    pub result_maps: Vec<ResultMap>,
    #[serde(default)]
    pub statements: Vec<StatementDescriptor>,
}

impl MapperConfig {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_result_map(mut self, result_map: ResultMap) -> Self {
        self.result_maps.push(result_map);
        self
    }

    pub fn with_statement(mut self, statement: StatementDescriptor) -> Self {
        self.statements.push(statement);
        self
    }

    /// Check namespace-local invariants: unique statement ids, resolvable
    /// result maps, caches configured for cacheable statements.
    pub fn validate(&self) -> MapperResult<()> {
        if self.namespace.trim().is_empty() {
            return Err(MapperError::configuration("Namespace name cannot be empty"));
        }
        if let Some(cache) = &self.cache {
            cache.validate().map_err(|msg| {
                MapperError::configuration(format!("Namespace '{}': {}", self.namespace, msg))
            })?;
        }

        let mut result_map_ids = HashSet::new();
        for result_map in &self.result_maps {
            if !result_map_ids.insert(result_map.id.as_str()) {
                return Err(MapperError::configuration(format!(
                    "Duplicate result map '{}' in namespace '{}'",
                    result_map.id, self.namespace
                )));
            }
        }

        let mut statement_ids = HashSet::new();
        for statement in &self.statements {
            if !statement_ids.insert(statement.id.as_str()) {
                return Err(MapperError::configuration(format!(
                    "Duplicate statement id '{}' in namespace '{}'",
                    statement.id, self.namespace
                )));
            }
            statement.validate()?;
            if let Some(result_map) = statement.result_map() {
                if !result_map_ids.contains(result_map) {
                    return Err(MapperError::configuration(format!(
                        "Statement '{}' references unknown result map '{}'",
                        statement.id, result_map
                    )));
                }
            }
            if statement.is_cacheable() && self.cache.is_none() {
                return Err(MapperError::configuration(format!(
                    "Statement '{}' is cacheable but namespace '{}' has no cache configured",
                    statement.id, self.namespace
                )));
            }
        }
        Ok(())
    }
}

/// Logging options for [`init_tracing`](crate::logging::init_tracing).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json_logs: bool,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

/// The fully resolved runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Configuration {
    /// Environment used by [`SessionFactory::build`](crate::session::SessionFactory::build).
    pub default_environment: String,
    #[serde(default)]
    pub environments: Vec<EnvironmentConfig>,
    #[serde(default)]
    pub mappers: Vec<MapperConfig>,
}

impl Configuration {
    pub fn new(default_environment: EnvironmentConfig) -> Self {
        Self {
            default_environment: default_environment.id.clone(),
            environments: vec![default_environment],
            mappers: Vec::new(),
        }
    }

    pub fn with_environment(mut self, environment: EnvironmentConfig) -> Self {
        self.environments.push(environment);
        self
    }

    pub fn with_mapper(mut self, mapper: MapperConfig) -> Self {
        self.mappers.push(mapper);
        self
    }

    /// Parse a resolved configuration from JSON and validate it.
    pub fn from_json_str(json: &str) -> MapperResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            MapperError::configuration(format!("Invalid configuration JSON: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn environment(&self, id: &str) -> Option<&EnvironmentConfig> {
        self.environments.iter().find(|env| env.id == id)
    }

    /// Validate every load-time invariant.
    pub fn validate(&self) -> MapperResult<()> {
        let mut environment_ids = HashSet::new();
        for env in &self.environments {
            if !environment_ids.insert(env.id.as_str()) {
                return Err(MapperError::configuration(format!(
                    "Duplicate environment '{}'",
                    env.id
                )));
            }
            if env.connection.url.trim().is_empty() {
                return Err(MapperError::configuration(format!(
                    "Environment '{}' has an empty connection url",
                    env.id
                )));
            }
            env.pool.validate().map_err(|msg| {
                MapperError::configuration(format!("Environment '{}': {}", env.id, msg))
            })?;
        }
        if !environment_ids.contains(self.default_environment.as_str()) {
            return Err(MapperError::configuration(format!(
                "Default environment '{}' is not defined",
                self.default_environment
            )));
        }

        let mut namespaces = HashSet::new();
        for mapper in &self.mappers {
            if !namespaces.insert(mapper.namespace.as_str()) {
                return Err(MapperError::configuration(format!(
                    "Duplicate namespace '{}'",
                    mapper.namespace
                )));
            }
            mapper.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::StatementDescriptor;

    fn environment() -> EnvironmentConfig {
        EnvironmentConfig::new("dev", ConnectionParams::new("sqlite::memory:"))
    }

    #[test]
    fn test_pool_defaults() {
        let pool = PoolConfig::default();
        assert_eq!(pool.pool_size_or_default(), DEFAULT_POOL_SIZE);
        assert_eq!(pool.keep_alive_or_default(), Duration::from_secs(600));
        assert_eq!(pool.leak_timeout_or_default(), Duration::from_secs(1800));
    }

    #[test]
    fn test_pool_validate_rejects_zero_size() {
        let pool = PoolConfig::default().with_pool_size(0);
        assert!(pool.validate().is_err());
        assert!(PoolConfig::default().with_pool_size(3).validate().is_ok());
    }

    #[test]
    fn test_sub_second_durations_kept() {
        let pool = PoolConfig::default()
            .with_keep_alive(Duration::from_millis(250))
            .with_leak_timeout(Duration::from_millis(1500));
        assert!(pool.validate().is_ok());
        assert_eq!(pool.keep_alive_or_default(), Duration::from_millis(250));
        assert_eq!(pool.leak_timeout_or_default(), Duration::from_millis(1500));

        let cache = CacheConfig::new(EvictionPolicy::Fifo, 8, Duration::from_millis(500));
        assert!(cache.validate().is_ok());
        assert_eq!(cache.ttl_or_default(), Duration::from_millis(500));

        let cache = CacheConfig::new(EvictionPolicy::Fifo, 8, Duration::ZERO);
        assert!(cache.validate().unwrap_err().contains("ttl_ms"));
    }

    #[test]
    fn test_eviction_policy_parsing() {
        assert_eq!("fifo".parse::<EvictionPolicy>().unwrap(), EvictionPolicy::Fifo);
        assert_eq!("LRU".parse::<EvictionPolicy>().unwrap(), EvictionPolicy::Lru);
        assert!("random".parse::<EvictionPolicy>().is_err());
    }

    #[test]
    fn test_duplicate_statement_id_rejected() {
        let config = Configuration::new(environment()).with_mapper(
            MapperConfig::new("EmployeeMapper")
                .with_statement(StatementDescriptor::delete("deleteEmployee", "DELETE FROM t"))
                .with_statement(StatementDescriptor::delete("deleteEmployee", "DELETE FROM u")),
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate statement id"));
    }

    #[test]
    fn test_duplicate_namespace_rejected() {
        let config = Configuration::new(environment())
            .with_mapper(MapperConfig::new("EmployeeMapper"))
            .with_mapper(MapperConfig::new("EmployeeMapper"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cacheable_statement_requires_cache() {
        let config = Configuration::new(environment()).with_mapper(
            MapperConfig::new("EmployeeMapper").with_statement(
                StatementDescriptor::select("getAllEmployees", "SELECT * FROM EMPLOYEES")
                    .cacheable(),
            ),
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("no cache configured"));
    }

    #[test]
    fn test_unknown_default_environment_rejected() {
        let mut config = Configuration::new(environment());
        config.default_environment = "prod".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_str() {
        let json = r#"{
            "default_environment": "dev",
            "environments": [
                {"id": "dev", "connection": {"url": "sqlite::memory:"}, "pool": {"pool_size": 2}},
                {"id": "batch", "data_source": "UNPOOLED", "connection": {"url": "sqlite::memory:"}}
            ],
            "mappers": [{
                "namespace": "EmployeeMapper",
                "cache": {"eviction_policy": "FIFO", "capacity": 100, "ttl_ms": 60000},
                "statements": [
                    {"id": "getEmployeeById", "kind": "SELECT",
                     "sql": "SELECT * FROM EMPLOYEES WHERE EMPLOYEE_ID = #{employeeId}",
                     "parameter_type": "int", "result_type": "Employee", "cacheable": true},
                    {"id": "deleteEmployee", "kind": "DELETE",
                     "sql": "DELETE FROM EMPLOYEES WHERE EMPLOYEE_ID = #{employeeId}",
                     "flush_cache": true}
                ]
            }]
        }"#;
        let config = Configuration::from_json_str(json).unwrap();
        assert_eq!(config.environments.len(), 2);
        assert_eq!(
            config.environment("batch").unwrap().data_source,
            DataSourceKind::Unpooled
        );
        let mapper = &config.mappers[0];
        assert_eq!(
            mapper.cache.as_ref().unwrap().eviction_policy,
            EvictionPolicy::Fifo
        );
        assert!(mapper.statements[0].is_cacheable());
        assert!(mapper.statements[1].flushes_cache());
    }
}
