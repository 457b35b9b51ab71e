//! Compiled statement registry.
//!
//! Every descriptor is compiled exactly once, when the registry is built, and
//! the registry is read-only afterwards so lookups need no locking.

use crate::config::MapperConfig;
use crate::error::{MapperError, MapperResult};
use crate::statement::compiler::{CompiledStatement, compile};
use crate::statement::descriptor::{ResultMap, StatementDescriptor};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A descriptor together with its compiled form and resolved result map.
#[derive(Debug)]
pub struct RegisteredStatement {
    pub namespace: String,
    pub descriptor: StatementDescriptor,
    pub compiled: CompiledStatement,
    pub result_map: Option<ResultMap>,
}

impl RegisteredStatement {
    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    /// `Namespace.statementId`
    pub fn qualified_id(&self) -> String {
        qualify(&self.namespace, &self.descriptor.id)
    }

    /// Record type name the rows bind onto: the explicit result type, else
    /// the result map's type.
    pub fn result_type(&self) -> Option<&str> {
        self.descriptor
            .result_type()
            .or_else(|| self.result_map.as_ref().map(|map| map.result_type.as_str()))
    }
}

fn qualify(namespace: &str, id: &str) -> String {
    format!("{}.{}", namespace, id)
}

#[derive(Debug, Default)]
pub struct StatementRegistry {
    /// Keyed by `Namespace.statementId`.
    qualified: HashMap<String, Arc<RegisteredStatement>>,
    /// Keyed by bare statement id; more than one entry means ambiguous.
    bare: HashMap<String, Vec<Arc<RegisteredStatement>>>,
}

impl StatementRegistry {
    /// Compile and register every statement of every namespace.
    pub fn build(mappers: &[MapperConfig]) -> MapperResult<Self> {
        let mut registry = Self::default();
        for mapper in mappers {
            for descriptor in &mapper.statements {
                let compiled = compile(&descriptor.sql).map_err(|e| match e {
                    MapperError::Configuration { message } => MapperError::configuration(
                        format!("Statement '{}.{}': {}", mapper.namespace, descriptor.id, message),
                    ),
                    other => other,
                })?;
                let result_map = descriptor
                    .result_map()
                    .map(|id| {
                        mapper
                            .result_maps
                            .iter()
                            .find(|map| map.id == id)
                            .cloned()
                            .ok_or_else(|| {
                                MapperError::configuration(format!(
                                    "Statement '{}' references unknown result map '{}'",
                                    descriptor.id, id
                                ))
                            })
                    })
                    .transpose()?;

                debug!(
                    namespace = %mapper.namespace,
                    statement = %descriptor.id,
                    params = compiled.param_fields.len(),
                    "Compiled statement"
                );

                let statement = Arc::new(RegisteredStatement {
                    namespace: mapper.namespace.clone(),
                    descriptor: descriptor.clone(),
                    compiled,
                    result_map,
                });
                let qualified = statement.qualified_id();
                if registry.qualified.contains_key(&qualified) {
                    return Err(MapperError::configuration(format!(
                        "Duplicate statement '{}'",
                        qualified
                    )));
                }
                registry.qualified.insert(qualified, Arc::clone(&statement));
                registry
                    .bare
                    .entry(descriptor.id.clone())
                    .or_default()
                    .push(statement);
            }
        }
        Ok(registry)
    }

    /// Resolve `Namespace.statementId`, or a bare id that is unique across
    /// namespaces.
    pub fn resolve(&self, id: &str) -> MapperResult<Arc<RegisteredStatement>> {
        if let Some(statement) = self.qualified.get(id) {
            return Ok(Arc::clone(statement));
        }
        match self.bare.get(id).map(Vec::as_slice) {
            Some([statement]) => Ok(Arc::clone(statement)),
            Some(candidates) if candidates.len() > 1 => {
                let namespaces: Vec<&str> =
                    candidates.iter().map(|s| s.namespace.as_str()).collect();
                Err(MapperError::configuration(format!(
                    "Statement id '{}' is ambiguous across namespaces {:?}; qualify it as Namespace.{}",
                    id, namespaces, id
                )))
            }
            _ => Err(MapperError::statement_not_found(id)),
        }
    }

    /// Statements of one namespace.
    pub fn in_namespace<'a>(
        &'a self,
        namespace: &'a str,
    ) -> impl Iterator<Item = &'a Arc<RegisteredStatement>> + 'a {
        self.qualified
            .values()
            .filter(move |statement| statement.namespace == namespace)
    }

    pub fn len(&self) -> usize {
        self.qualified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.qualified.is_empty()
    }
}
