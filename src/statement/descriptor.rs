//! Statement descriptors.
//!
//! A descriptor is the resolved form of one configured SQL operation. The
//! kind-specific options live in the [`StatementKind`] variants so that, for
//! example, only SELECTs can be cacheable and only INSERT/UPDATE can return
//! generated keys.

use crate::error::{MapperError, MapperResult};
use crate::statement::compiler::normalize_field_name;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The four statement kinds, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementType {
    Select,
    Insert,
    Update,
    Delete,
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select => write!(f, "SELECT"),
            Self::Insert => write!(f, "INSERT"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOptions {
    /// Record type name the rows bind onto.
    #[serde(default)]
    pub result_type: Option<String>,
    /// Id of a result map in the same namespace.
    #[serde(default)]
    pub result_map: Option<String>,
    #[serde(default)]
    pub cacheable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOptions {
    #[serde(default)]
    pub use_generated_keys: bool,
    /// Parameter field that receives the generated key.
    #[serde(default)]
    pub key_field: Option<String>,
    #[serde(default)]
    pub flush_cache: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOptions {
    #[serde(default)]
    pub flush_cache: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "UPPERCASE")]
pub enum StatementKind {
    Select(SelectOptions),
    Insert(WriteOptions),
    Update(WriteOptions),
    Delete(DeleteOptions),
}

impl StatementKind {
    pub fn statement_type(&self) -> StatementType {
        match self {
            Self::Select(_) => StatementType::Select,
            Self::Insert(_) => StatementType::Insert,
            Self::Update(_) => StatementType::Update,
            Self::Delete(_) => StatementType::Delete,
        }
    }
}

/// Declared shape of a statement's parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParameterType {
    Integer,
    Float,
    Text,
    Bool,
    Bytes,
    /// A record type, by name.
    Record(String),
}

impl ParameterType {
    /// Resolve a configured type name. Scalar aliases are case-insensitive;
    /// anything else names a record type.
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "int" | "integer" | "long" | "short" | "i32" | "i64" | "u32" => Self::Integer,
            "float" | "double" | "real" | "f32" | "f64" | "decimal" => Self::Float,
            "string" | "str" | "text" | "varchar" => Self::Text,
            "bool" | "boolean" => Self::Bool,
            "bytes" | "blob" | "binary" => Self::Bytes,
            _ => Self::Record(name.to_string()),
        }
    }

    /// Whether a value of type `actual` satisfies this declared type. Record
    /// names match on their last `.`-separated segment, so `com.acme.Employee`
    /// accepts `Employee`.
    pub fn accepts(&self, actual: &ParameterType) -> bool {
        match (self, actual) {
            (Self::Record(declared), Self::Record(actual)) => {
                simple_name(declared) == simple_name(actual)
            }
            (declared, actual) => declared == actual,
        }
    }
}

fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "integer"),
            Self::Float => write!(f, "float"),
            Self::Text => write!(f, "text"),
            Self::Bool => write!(f, "bool"),
            Self::Bytes => write!(f, "bytes"),
            Self::Record(name) => write!(f, "{}", name),
        }
    }
}

/// One configured SQL operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementDescriptor {
    pub id: String,
    /// Raw template with `#{field}` placeholders.
    pub sql: String,
    #[serde(default)]
    pub parameter_type: Option<String>,
    #[serde(flatten)]
    pub kind: StatementKind,
}

impl StatementDescriptor {
    fn with_kind(id: impl Into<String>, sql: impl Into<String>, kind: StatementKind) -> Self {
        Self {
            id: id.into(),
            sql: sql.into(),
            parameter_type: None,
            kind,
        }
    }

    pub fn select(id: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::with_kind(id, sql, StatementKind::Select(SelectOptions::default()))
    }

    pub fn insert(id: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::with_kind(id, sql, StatementKind::Insert(WriteOptions::default()))
    }

    pub fn update(id: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::with_kind(id, sql, StatementKind::Update(WriteOptions::default()))
    }

    pub fn delete(id: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::with_kind(id, sql, StatementKind::Delete(DeleteOptions::default()))
    }

    pub fn with_parameter_type(mut self, name: impl Into<String>) -> Self {
        self.parameter_type = Some(name.into());
        self
    }

    /// Set the result record type. Ignored for writes.
    pub fn with_result_type(mut self, name: impl Into<String>) -> Self {
        if let StatementKind::Select(options) = &mut self.kind {
            options.result_type = Some(name.into());
        }
        self
    }

    /// Reference a result map. Ignored for writes.
    pub fn with_result_map(mut self, id: impl Into<String>) -> Self {
        if let StatementKind::Select(options) = &mut self.kind {
            options.result_map = Some(id.into());
        }
        self
    }

    /// Mark a SELECT as cacheable. Ignored for writes.
    pub fn cacheable(mut self) -> Self {
        if let StatementKind::Select(options) = &mut self.kind {
            options.cacheable = true;
        }
        self
    }

    /// Flush the namespace caches before this write runs. Ignored for SELECTs.
    pub fn flush_cache(mut self) -> Self {
        match &mut self.kind {
            StatementKind::Insert(options) | StatementKind::Update(options) => {
                options.flush_cache = true
            }
            StatementKind::Delete(options) => options.flush_cache = true,
            StatementKind::Select(_) => {}
        }
        self
    }

    /// Write the generated key back onto `key_field`. INSERT/UPDATE only.
    pub fn generated_key(mut self, key_field: impl Into<String>) -> Self {
        if let StatementKind::Insert(options) | StatementKind::Update(options) = &mut self.kind {
            options.use_generated_keys = true;
            options.key_field = Some(key_field.into());
        }
        self
    }

    pub fn statement_type(&self) -> StatementType {
        self.kind.statement_type()
    }

    pub fn is_cacheable(&self) -> bool {
        matches!(&self.kind, StatementKind::Select(options) if options.cacheable)
    }

    pub fn flushes_cache(&self) -> bool {
        match &self.kind {
            StatementKind::Select(_) => false,
            StatementKind::Insert(options) | StatementKind::Update(options) => options.flush_cache,
            StatementKind::Delete(options) => options.flush_cache,
        }
    }

    pub fn result_type(&self) -> Option<&str> {
        match &self.kind {
            StatementKind::Select(options) => options.result_type.as_deref(),
            _ => None,
        }
    }

    pub fn result_map(&self) -> Option<&str> {
        match &self.kind {
            StatementKind::Select(options) => options.result_map.as_deref(),
            _ => None,
        }
    }

    /// Key field to fill from generated keys, when enabled.
    pub fn generated_key_field(&self) -> Option<&str> {
        match &self.kind {
            StatementKind::Insert(options) | StatementKind::Update(options)
                if options.use_generated_keys =>
            {
                options.key_field.as_deref()
            }
            _ => None,
        }
    }

    pub fn declared_parameter_type(&self) -> Option<ParameterType> {
        self.parameter_type.as_deref().map(ParameterType::parse)
    }

    /// Check descriptor-local invariants.
    pub fn validate(&self) -> MapperResult<()> {
        if self.id.trim().is_empty() {
            return Err(MapperError::configuration("Statement id cannot be empty"));
        }
        if self.sql.trim().is_empty() {
            return Err(MapperError::configuration(format!(
                "Statement '{}' has an empty SQL template",
                self.id
            )));
        }
        if let StatementKind::Insert(options) | StatementKind::Update(options) = &self.kind {
            let key_field_missing = options
                .key_field
                .as_deref()
                .map(|field| normalize_field_name(field).is_empty())
                .unwrap_or(true);
            if options.use_generated_keys && key_field_missing {
                return Err(MapperError::configuration(format!(
                    "Statement '{}' uses generated keys but declares no key field",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

/// One explicit column-to-property override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMapping {
    pub column: String,
    pub property: String,
    /// Marks the identifier column.
    #[serde(default)]
    pub id: bool,
}

/// Named column overrides for a record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMap {
    pub id: String,
    pub result_type: String,
    #[serde(default)]
    pub mappings: Vec<ResultMapping>,
}

impl ResultMap {
    pub fn new(id: impl Into<String>, result_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            result_type: result_type.into(),
            mappings: Vec::new(),
        }
    }

    pub fn with_mapping(mut self, column: impl Into<String>, property: impl Into<String>) -> Self {
        self.mappings.push(ResultMapping {
            column: column.into(),
            property: property.into(),
            id: false,
        });
        self
    }

    pub fn with_id_mapping(mut self, column: impl Into<String>, property: impl Into<String>) -> Self {
        self.mappings.push(ResultMapping {
            column: column.into(),
            property: property.into(),
            id: true,
        });
        self
    }

    /// Property overriding `column`, compared by normalized name.
    pub fn property_for(&self, column: &str) -> Option<&str> {
        let column = normalize_field_name(column);
        self.mappings
            .iter()
            .find(|mapping| normalize_field_name(&mapping.column) == column)
            .map(|mapping| mapping.property.as_str())
    }
}
