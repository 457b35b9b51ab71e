//! Data sources: where sessions get their connections from.
//!
//! A pooled data source owns exactly one [`ConnectionPool`], created by an
//! explicit [`PooledDataSource::init`]. An unpooled data source opens a fresh
//! physical connection for every statement.

use crate::config::{DataSourceKind, EnvironmentConfig, PoolConfig};
use crate::db::driver::{Connection, ConnectionParams, Driver};
use crate::db::pool::{ConnectionPool, PooledConnection};
use crate::error::{MapperError, MapperResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

pub struct PooledDataSource {
    driver: Arc<dyn Driver>,
    params: ConnectionParams,
    config: PoolConfig,
    init_started: AtomicBool,
    pool: OnceLock<ConnectionPool>,
}

impl PooledDataSource {
    pub fn new(driver: Arc<dyn Driver>, params: ConnectionParams, config: PoolConfig) -> Self {
        Self {
            driver,
            params,
            config,
            init_started: AtomicBool::new(false),
            pool: OnceLock::new(),
        }
    }

    /// Open the pool. A second call fails with `AlreadyInitialized`, also
    /// while the first one is still connecting. A failed init may be retried.
    pub async fn init(&self) -> MapperResult<&ConnectionPool> {
        if self.init_started.swap(true, Ordering::SeqCst) {
            return Err(MapperError::AlreadyInitialized);
        }
        match ConnectionPool::open(Arc::clone(&self.driver), self.params.clone(), &self.config).await {
            Ok(pool) => Ok(self.pool.get_or_init(|| pool)),
            Err(e) => {
                self.init_started.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// The pool, once initialized.
    pub fn pool(&self) -> MapperResult<&ConnectionPool> {
        self.pool.get().ok_or(MapperError::NotInitialized)
    }

    pub fn is_initialized(&self) -> bool {
        self.pool.get().is_some()
    }
}

pub struct UnpooledDataSource {
    driver: Arc<dyn Driver>,
    params: ConnectionParams,
}

impl UnpooledDataSource {
    pub fn new(driver: Arc<dyn Driver>, params: ConnectionParams) -> Self {
        Self { driver, params }
    }

    pub async fn open(&self) -> MapperResult<Box<dyn Connection>> {
        let connection = self.driver.connect(&self.params).await?;
        debug!("Opened unpooled connection");
        Ok(connection)
    }
}

pub enum DataSource {
    Pooled(PooledDataSource),
    Unpooled(UnpooledDataSource),
}

impl DataSource {
    /// Build the data source an environment asks for. Pooled sources still
    /// need [`DataSource::init`].
    pub fn for_environment(environment: &EnvironmentConfig, driver: Arc<dyn Driver>) -> Self {
        let params = environment.connection.clone();
        match environment.data_source {
            DataSourceKind::Pooled => Self::Pooled(PooledDataSource::new(
                driver,
                params,
                environment.pool.clone(),
            )),
            DataSourceKind::Unpooled => Self::Unpooled(UnpooledDataSource::new(driver, params)),
        }
    }

    pub fn kind(&self) -> DataSourceKind {
        match self {
            Self::Pooled(_) => DataSourceKind::Pooled,
            Self::Unpooled(_) => DataSourceKind::Unpooled,
        }
    }

    /// Initialize the pool of a pooled source. No-op for unpooled sources.
    pub async fn init(&self) -> MapperResult<()> {
        match self {
            Self::Pooled(source) => source.init().await.map(|_| ()),
            Self::Unpooled(_) => Ok(()),
        }
    }

    pub fn pool(&self) -> Option<&ConnectionPool> {
        match self {
            Self::Pooled(source) => source.pool().ok(),
            Self::Unpooled(_) => None,
        }
    }

    /// Obtain a connection for one statement.
    pub async fn lease(&self) -> MapperResult<Lease> {
        match self {
            Self::Pooled(source) => Ok(Lease::Pooled(source.pool()?.get_connection().await?)),
            Self::Unpooled(source) => Ok(Lease::Unpooled(source.open().await?)),
        }
    }
}

/// A connection held for the duration of one statement.
pub enum Lease {
    Pooled(PooledConnection),
    Unpooled(Box<dyn Connection>),
}

impl Lease {
    pub fn connection_mut(&mut self) -> MapperResult<&mut Box<dyn Connection>> {
        match self {
            Self::Pooled(conn) => conn.connection_mut(),
            Self::Unpooled(conn) => Ok(conn),
        }
    }

    /// Give the connection back: to the pool, or closed by dropping it.
    pub async fn release(self) {
        match self {
            Self::Pooled(conn) => {
                let connection_id = conn.id().to_string();
                if !conn.release().await {
                    warn!(connection_id = %connection_id, "Pool refused released connection");
                }
            }
            Self::Unpooled(conn) => drop(conn),
        }
    }
}
