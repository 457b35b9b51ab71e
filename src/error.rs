//! Error types for the mapping runtime.
//!
//! Every failure the engine can report is a variant of [`MapperError`]. Most
//! variants describe programmer or configuration mistakes and carry enough
//! context (statement id, field name, expected/found shapes) to fix them.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapperError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Statement not found: {statement}")]
    StatementNotFound { statement: String },

    #[error("Connection pool exhausted: all {pool_size} connections are leased")]
    PoolExhausted { pool_size: usize },

    #[error("Connection pool is already initialized")]
    AlreadyInitialized,

    #[error("Connection pool is not initialized")]
    NotInitialized,

    #[error("Connection {connection_id} was not returned within {window_ms}ms and is treated as leaked")]
    ConnectionLeaked {
        connection_id: String,
        window_ms: u64,
    },

    #[error("Statement '{statement}' expected at most one row but the query returned {rows}")]
    TooManyResults { statement: String, rows: usize },

    #[error("Column '{column}' has no matching field on {shape}")]
    UnknownField { column: String, shape: String },

    #[error("Statement '{statement}' expects parameter type {expected}, got {found}")]
    WrongParameterType {
        statement: String,
        expected: String,
        found: String,
    },

    #[error("Statement '{statement}' is a {found} statement, not {expected}")]
    WrongQueryType {
        statement: String,
        expected: String,
        found: String,
    },

    #[error("Statement '{statement}' produces {expected} rows, requested as {found}")]
    WrongResultType {
        statement: String,
        expected: String,
        found: String,
    },

    #[error("Cannot convert {found} into {expected} for field '{field}'")]
    Conversion {
        field: String,
        expected: String,
        found: String,
    },

    #[error("Ring buffer capacity of {capacity} exceeded")]
    CapacityExceeded { capacity: usize },

    #[error("Ring buffer is empty")]
    EmptyQueue,

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "2067" for a SQLite unique constraint violation
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl MapperError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn statement_not_found(statement: impl Into<String>) -> Self {
        Self::StatementNotFound {
            statement: statement.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    pub fn unknown_field(column: impl Into<String>, shape: impl Into<String>) -> Self {
        Self::UnknownField {
            column: column.into(),
            shape: shape.into(),
        }
    }

    pub fn conversion(
        field: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::Conversion {
            field: field.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn wrong_parameter_type(
        statement: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::WrongParameterType {
            statement: statement.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn wrong_query_type(
        statement: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::WrongQueryType {
            statement: statement.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn wrong_result_type(
        statement: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::WrongResultType {
            statement: statement.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// Errors that indicate a programming or configuration mistake. These are
    /// never retried and should stop the caller.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. }
                | Self::AlreadyInitialized
                | Self::NotInitialized
                | Self::ConnectionLeaked { .. }
        )
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

/// Convert sqlx errors to MapperError.
impl From<sqlx::Error> for MapperError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => MapperError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                MapperError::database(
                    db_err.message(),
                    code,
                    "Check the SQL syntax and referenced objects",
                )
            }
            sqlx::Error::Io(io_err) => MapperError::connection(
                format!("I/O error: {}", io_err),
                "Check that the database file or server is reachable",
            ),
            sqlx::Error::Protocol(msg) => MapperError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnNotFound(col) => {
                MapperError::internal(format!("Column not found: {}", col))
            }
            sqlx::Error::ColumnDecode { index, source } => {
                MapperError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => {
                MapperError::internal(format!("Decode error: {}", source))
            }
            sqlx::Error::WorkerCrashed => {
                MapperError::connection("Database worker crashed", "Reconnect to the database")
            }
            _ => MapperError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for mapper operations.
pub type MapperResult<T> = Result<T, MapperError>;
