//! Statement execution.
//!
//! [`SessionExecutor`] ties the compiled registry, the namespace caches and
//! the data source together. Every execution leases one connection and gives
//! it back on every exit path, errors included.

use crate::binding::{FromRow, Parameter, bind_parameters, generated_key};
use crate::cache::CachedRows;
use crate::db::{ConnectionPool, DataSource};
use crate::error::{MapperError, MapperResult};
use crate::mapper::Namespace;
use crate::models::{ExecuteResult, Row, Value, WriteResult};
use crate::statement::{ParameterType, RegisteredStatement, StatementRegistry, StatementType};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Fail with `WrongQueryType` unless `statement` is of kind `expected`.
pub(crate) fn check_kind(statement: &RegisteredStatement, expected: StatementType) -> MapperResult<()> {
    let found = statement.descriptor.statement_type();
    if found != expected {
        return Err(MapperError::wrong_query_type(
            statement.qualified_id(),
            expected.to_string(),
            found.to_string(),
        ));
    }
    Ok(())
}

/// Fail with `WrongParameterType` when the statement declares a parameter
/// type that `actual` does not satisfy. `None` means "no parameter".
pub(crate) fn check_parameter_type(
    statement: &RegisteredStatement,
    actual: Option<&ParameterType>,
) -> MapperResult<()> {
    let Some(declared) = statement.descriptor.declared_parameter_type() else {
        return Ok(());
    };
    match actual {
        Some(actual) if declared.accepts(actual) => Ok(()),
        Some(actual) => Err(MapperError::wrong_parameter_type(
            statement.qualified_id(),
            declared.to_string(),
            actual.to_string(),
        )),
        None => Err(MapperError::wrong_parameter_type(
            statement.qualified_id(),
            declared.to_string(),
            "no parameter",
        )),
    }
}

/// Fail with `WrongResultType` when the statement's declared result type
/// does not accept `actual`.
pub(crate) fn check_result_type(statement: &RegisteredStatement, actual: &ParameterType) -> MapperResult<()> {
    let Some(declared) = statement.result_type() else {
        return Ok(());
    };
    let declared = ParameterType::parse(declared);
    if declared.accepts(actual) {
        Ok(())
    } else {
        Err(MapperError::wrong_result_type(
            statement.qualified_id(),
            declared.to_string(),
            actual.to_string(),
        ))
    }
}

pub struct SessionExecutor {
    registry: StatementRegistry,
    namespaces: HashMap<String, Namespace>,
    data_source: DataSource,
}

impl SessionExecutor {
    pub fn new(
        registry: StatementRegistry,
        namespaces: Vec<Namespace>,
        data_source: DataSource,
    ) -> Self {
        Self {
            registry,
            namespaces: namespaces
                .into_iter()
                .map(|namespace| (namespace.name().to_string(), namespace))
                .collect(),
            data_source,
        }
    }

    pub fn registry(&self) -> &StatementRegistry {
        &self.registry
    }

    pub fn namespace(&self, name: &str) -> Option<&Namespace> {
        self.namespaces.get(name)
    }

    pub fn data_source(&self) -> &DataSource {
        &self.data_source
    }

    /// The connection pool, for pooled data sources.
    pub fn pool(&self) -> Option<&ConnectionPool> {
        self.data_source.pool()
    }

    /// Run a SELECT expected to return at most one row.
    pub async fn select_one<P, R>(&self, statement_id: &str, param: &P) -> MapperResult<Option<R>>
    where
        P: Parameter,
        R: FromRow,
    {
        let statement = self.prepare_select::<P, R>(statement_id)?;
        let rows = self.fetch_rows(&statement, param).await?;
        if rows.len() > 1 {
            return Err(MapperError::TooManyResults {
                statement: statement.qualified_id(),
                rows: rows.len(),
            });
        }
        rows.first()
            .map(|row| R::from_row(row, statement.result_map.as_ref()))
            .transpose()
    }

    /// Run a SELECT and bind every row, in order.
    pub async fn select_list<P, R>(&self, statement_id: &str, param: &P) -> MapperResult<Vec<R>>
    where
        P: Parameter,
        R: FromRow,
    {
        let statement = self.prepare_select::<P, R>(statement_id)?;
        let rows = self.fetch_rows(&statement, param).await?;
        rows.iter()
            .map(|row| R::from_row(row, statement.result_map.as_ref()))
            .collect()
    }

    /// Run an INSERT. Generated keys are written back onto `param`.
    pub async fn insert<P: Parameter>(&self, statement_id: &str, param: &mut P) -> MapperResult<WriteResult> {
        self.write(statement_id, StatementType::Insert, param).await
    }

    /// Run an UPDATE. Only INSERTs produce generated keys, so none are
    /// written back here.
    pub async fn update<P: Parameter>(&self, statement_id: &str, param: &mut P) -> MapperResult<WriteResult> {
        self.write(statement_id, StatementType::Update, param).await
    }

    /// Run a DELETE and return the affected row count.
    pub async fn delete<P: Parameter>(&self, statement_id: &str, param: &P) -> MapperResult<u64> {
        let statement = self.registry.resolve(statement_id)?;
        check_kind(&statement, StatementType::Delete)?;
        check_parameter_type(&statement, P::parameter_type().as_ref())?;

        let params = bind_parameters(param, &statement.compiled.param_fields)?;
        self.flush_if_requested(&statement);
        let result = self.execute(&statement, &params, false).await?;
        Ok(result.rows_affected)
    }

    fn prepare_select<P: Parameter, R: FromRow>(
        &self,
        statement_id: &str,
    ) -> MapperResult<Arc<RegisteredStatement>> {
        let statement = self.registry.resolve(statement_id)?;
        check_kind(&statement, StatementType::Select)?;
        check_parameter_type(&statement, P::parameter_type().as_ref())?;
        check_result_type(&statement, &R::row_type())?;
        Ok(statement)
    }

    async fn write<P: Parameter>(
        &self,
        statement_id: &str,
        kind: StatementType,
        param: &mut P,
    ) -> MapperResult<WriteResult> {
        let statement = self.registry.resolve(statement_id)?;
        check_kind(&statement, kind)?;
        check_parameter_type(&statement, P::parameter_type().as_ref())?;

        let params = bind_parameters(&*param, &statement.compiled.param_fields)?;
        // Only an INSERT produces a key; on other writes the driver would
        // report the connection's last inserted row instead.
        let key_field = statement
            .descriptor
            .generated_key_field()
            .filter(|_| kind == StatementType::Insert);
        self.flush_if_requested(&statement);
        let result = self.execute(&statement, &params, key_field.is_some()).await?;

        let generated = match (key_field, &result.generated_keys) {
            (Some(field), Some(keys)) => {
                let key = generated_key(keys, field)?;
                param.set_generated_key(field, key.clone())?;
                Some(key)
            }
            _ => None,
        };
        Ok(WriteResult {
            rows_affected: result.rows_affected,
            generated_key: generated,
        })
    }

    fn flush_if_requested(&self, statement: &RegisteredStatement) {
        if !statement.descriptor.flushes_cache() {
            return;
        }
        if let Some(namespace) = self.namespaces.get(&statement.namespace) {
            namespace.flush_caches();
        }
    }

    /// Rows for a SELECT, from the statement cache when possible.
    async fn fetch_rows<P: Parameter>(
        &self,
        statement: &RegisteredStatement,
        param: &P,
    ) -> MapperResult<CachedRows> {
        let cache = self
            .namespaces
            .get(&statement.namespace)
            .and_then(|namespace| namespace.cache(statement.id()))
            .filter(|_| statement.descriptor.is_cacheable());

        let Some(cache) = cache else {
            let params = bind_parameters(param, &statement.compiled.param_fields)?;
            return Ok(Arc::new(self.query(statement, &params).await?));
        };

        let key = param.cache_key();
        if let Some(rows) = cache.get(&key) {
            debug!(statement = %statement.qualified_id(), "Cache hit");
            return Ok(rows);
        }
        debug!(statement = %statement.qualified_id(), "Cache miss");

        let params = bind_parameters(param, &statement.compiled.param_fields)?;
        let rows: CachedRows = Arc::new(self.query(statement, &params).await?);
        cache.set(key, Arc::clone(&rows));
        Ok(rows)
    }

    async fn query(&self, statement: &RegisteredStatement, params: &[Value]) -> MapperResult<Vec<Row>> {
        debug!(
            statement = %statement.qualified_id(),
            params = params.len(),
            "Executing query"
        );
        let mut lease = self.data_source.lease().await?;
        let result = match lease.connection_mut() {
            Ok(conn) => conn.query(&statement.compiled.sql, params).await,
            Err(e) => Err(e),
        };
        lease.release().await;
        result
    }

    async fn execute(
        &self,
        statement: &RegisteredStatement,
        params: &[Value],
        return_keys: bool,
    ) -> MapperResult<ExecuteResult> {
        debug!(
            statement = %statement.qualified_id(),
            params = params.len(),
            return_keys = return_keys,
            "Executing write"
        );
        let mut lease = self.data_source.lease().await?;
        let result = match lease.connection_mut() {
            Ok(conn) => conn.execute(&statement.compiled.sql, params, return_keys).await,
            Err(e) => Err(e),
        };
        lease.release().await;
        result
    }
}

impl std::fmt::Debug for SessionExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionExecutor")
            .field("statements", &self.registry.len())
            .field("namespaces", &self.namespaces.keys().collect::<Vec<_>>())
            .field("data_source", &self.data_source.kind())
            .finish()
    }
}
