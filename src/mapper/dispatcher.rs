//! Table-driven dispatch from repository contract methods to statements.
//!
//! A contract (usually declared with [`mapper!`](crate::mapper)) lists its
//! methods as [`MethodSignature`]s. [`MapperDispatcher::new`] resolves each one
//! to a statement and checks kind, parameter type and result type up front,
//! so a contract that does not fit its configuration fails when the mapper is
//! created instead of on first call.

use crate::binding::{FromRow, Parameter};
use crate::error::{MapperError, MapperResult};
use crate::models::WriteResult;
use crate::session::SessionExecutor;
use crate::session::executor::{check_kind, check_parameter_type, check_result_type};
use crate::statement::{
    ParameterType, RegisteredStatement, StatementType, normalize_field_name,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// One method of a repository contract.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSignature {
    pub name: &'static str,
    pub statement_type: StatementType,
    /// Explicit statement id. Without one, the statement whose normalized id
    /// equals the normalized method name is used.
    pub statement_id: Option<&'static str>,
    /// `None` for methods without a parameter.
    pub parameter_type: Option<ParameterType>,
    /// Row type of SELECT methods.
    pub result_type: Option<ParameterType>,
}

/// A repository contract implemented by dispatching to statements.
pub trait MapperContract: Sized {
    /// Namespace whose statements back the contract.
    const NAMESPACE: &'static str;

    fn methods() -> Vec<MethodSignature>;

    fn from_dispatcher(dispatcher: MapperDispatcher) -> Self;
}

pub struct MapperDispatcher {
    executor: Arc<SessionExecutor>,
    namespace: &'static str,
    /// Method name to qualified statement id.
    routes: HashMap<&'static str, String>,
}

impl MapperDispatcher {
    /// Resolve and check every method. Any failure is a configuration error.
    pub fn new(
        executor: Arc<SessionExecutor>,
        namespace: &'static str,
        methods: &[MethodSignature],
    ) -> MapperResult<Self> {
        let mut routes = HashMap::with_capacity(methods.len());
        for method in methods {
            let statement = resolve_method(&executor, namespace, method)
                .and_then(|statement| {
                    check_method(&statement, method)?;
                    Ok(statement)
                })
                .map_err(|e| {
                    MapperError::configuration(format!(
                        "Mapper method '{}::{}': {}",
                        namespace, method.name, e
                    ))
                })?;
            debug!(
                namespace = namespace,
                method = method.name,
                statement = %statement.qualified_id(),
                "Routed mapper method"
            );
            if routes.insert(method.name, statement.qualified_id()).is_some() {
                return Err(MapperError::configuration(format!(
                    "Mapper '{}' declares method '{}' twice",
                    namespace, method.name
                )));
            }
        }
        Ok(Self {
            executor,
            namespace,
            routes,
        })
    }

    pub fn namespace(&self) -> &str {
        self.namespace
    }

    /// Qualified statement id a method dispatches to.
    pub fn route(&self, method: &str) -> MapperResult<&str> {
        self.routes.get(method).map(String::as_str).ok_or_else(|| {
            MapperError::configuration(format!(
                "Mapper '{}' has no method '{}'",
                self.namespace, method
            ))
        })
    }

    pub async fn select_one<P, R>(&self, method: &str, param: &P) -> MapperResult<Option<R>>
    where
        P: Parameter,
        R: FromRow,
    {
        self.executor.select_one(self.route(method)?, param).await
    }

    pub async fn select_list<P, R>(&self, method: &str, param: &P) -> MapperResult<Vec<R>>
    where
        P: Parameter,
        R: FromRow,
    {
        self.executor.select_list(self.route(method)?, param).await
    }

    pub async fn insert<P: Parameter>(&self, method: &str, param: &mut P) -> MapperResult<WriteResult> {
        self.executor.insert(self.route(method)?, param).await
    }

    pub async fn update<P: Parameter>(&self, method: &str, param: &mut P) -> MapperResult<WriteResult> {
        self.executor.update(self.route(method)?, param).await
    }

    pub async fn delete<P: Parameter>(&self, method: &str, param: &P) -> MapperResult<u64> {
        self.executor.delete(self.route(method)?, param).await
    }
}

impl std::fmt::Debug for MapperDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapperDispatcher")
            .field("namespace", &self.namespace)
            .field("routes", &self.routes)
            .finish()
    }
}

fn resolve_method(
    executor: &SessionExecutor,
    namespace: &str,
    method: &MethodSignature,
) -> MapperResult<Arc<RegisteredStatement>> {
    if let Some(id) = method.statement_id {
        let qualified = if id.contains('.') {
            id.to_string()
        } else {
            format!("{}.{}", namespace, id)
        };
        return executor.registry().resolve(&qualified);
    }

    let wanted = normalize_field_name(method.name);
    let mut candidates = executor
        .registry()
        .in_namespace(namespace)
        .filter(|statement| normalize_field_name(statement.id()) == wanted);
    match (candidates.next(), candidates.next()) {
        (Some(statement), None) => Ok(Arc::clone(statement)),
        (None, _) => Err(MapperError::configuration(format!(
            "no statement in namespace '{}' matches the method name",
            namespace
        ))),
        (Some(_), Some(_)) => Err(MapperError::configuration(
            "more than one statement matches the method name; give the statement id explicitly",
        )),
    }
}

fn check_method(statement: &RegisteredStatement, method: &MethodSignature) -> MapperResult<()> {
    check_kind(statement, method.statement_type)?;
    check_parameter_type(statement, method.parameter_type.as_ref())?;
    if let Some(result_type) = &method.result_type {
        check_result_type(statement, result_type)?;
    }
    Ok(())
}
