//! Session factory: the composition root of the runtime.

use crate::config::Configuration;
use crate::db::{ConnectionPool, DataSource, Driver};
use crate::error::{MapperError, MapperResult};
use crate::mapper::Namespace;
use crate::session::{Session, SessionExecutor};
use crate::statement::StatementRegistry;
use std::sync::Arc;
use tracing::info;

/// Builds sessions over one environment's data source.
///
/// Building compiles every statement, creates the namespace caches and, for
/// pooled environments, opens the pool. Clones share all of it.
#[derive(Clone, Debug)]
pub struct SessionFactory {
    executor: Arc<SessionExecutor>,
    environment: String,
}

impl SessionFactory {
    /// Build a factory for the configuration's default environment.
    pub async fn build(config: Configuration, driver: Arc<dyn Driver>) -> MapperResult<Self> {
        let environment = config.default_environment.clone();
        Self::build_for_environment(config, &environment, driver).await
    }

    pub async fn build_for_environment(
        config: Configuration,
        environment: &str,
        driver: Arc<dyn Driver>,
    ) -> MapperResult<Self> {
        config.validate()?;
        let env = config.environment(environment).ok_or_else(|| {
            MapperError::configuration(format!("Environment '{}' is not defined", environment))
        })?;

        let registry = StatementRegistry::build(&config.mappers)?;
        let namespaces = config
            .mappers
            .iter()
            .map(Namespace::from_config)
            .collect::<MapperResult<Vec<Namespace>>>()?;
        let data_source = DataSource::for_environment(env, driver);
        data_source.init().await?;

        info!(
            environment = %env.id,
            data_source = ?env.data_source,
            namespaces = namespaces.len(),
            statements = registry.len(),
            "Session factory built"
        );

        Ok(Self {
            executor: Arc::new(SessionExecutor::new(registry, namespaces, data_source)),
            environment: env.id.clone(),
        })
    }

    pub fn open_session(&self) -> Session {
        Session::new(Arc::clone(&self.executor))
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// The connection pool, for pooled environments.
    pub fn pool(&self) -> Option<&ConnectionPool> {
        self.executor.pool()
    }

    pub fn executor(&self) -> &Arc<SessionExecutor> {
        &self.executor
    }
}
