//! SQLite driver on top of sqlx.
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies the storage class of each value
//! 2. The matching decoder extracts it into a [`Value`]

use crate::db::driver::{Connection, ConnectionParams, Driver, LIVENESS_QUERY};
use crate::error::{MapperError, MapperResult};
use crate::models::{ExecuteResult, Row, Value};
use futures_util::future::BoxFuture;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqliteRow};
use sqlx::{Column as _, ConnectOptions as _, Row as _, Sqlite, TypeInfo as _, ValueRef as _};
use std::str::FromStr;
use tracing::debug;

/// Column name the generated-key row uses, as SQLite's own function.
pub const GENERATED_KEY_COLUMN: &str = "last_insert_rowid()";

/// Logical category for SQLite storage classes and declared types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Boolean,
    Text,
    Binary,
}

/// Classify a SQLite type name into a logical category.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let lower = type_name.to_lowercase();

    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }
    if lower.contains("int") {
        return TypeCategory::Integer;
    }
    if lower.contains("real")
        || lower.contains("float")
        || lower.contains("double")
        || lower.contains("numeric")
        || lower.contains("decimal")
    {
        return TypeCategory::Float;
    }
    if lower.contains("blob") || lower.contains("binary") {
        return TypeCategory::Binary;
    }
    // text, varchar, date, datetime...
    TypeCategory::Text
}

/// Opens [`SqliteConnection`]s. Missing database files are created.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDriver;

impl SqliteDriver {
    pub fn new() -> Self {
        Self
    }
}

impl Driver for SqliteDriver {
    fn connect<'a>(
        &'a self,
        params: &'a ConnectionParams,
    ) -> BoxFuture<'a, MapperResult<Box<dyn Connection>>> {
        Box::pin(async move {
            if params.username.is_some() {
                debug!("SQLite ignores connection credentials");
            }
            let options = SqliteConnectOptions::from_str(&params.url)?.create_if_missing(true);
            let inner = options.connect().await?;
            Ok(Box::new(SqliteConnection {
                inner,
                closed: false,
            }) as Box<dyn Connection>)
        })
    }
}

/// One SQLite connection.
pub struct SqliteConnection {
    inner: sqlx::SqliteConnection,
    closed: bool,
}

impl SqliteConnection {
    /// Remember fatal transport failures so the pool can drop this connection.
    fn track<T>(&mut self, result: Result<T, sqlx::Error>) -> MapperResult<T> {
        result.map_err(|e| {
            if matches!(e, sqlx::Error::Io(_) | sqlx::Error::WorkerCrashed) {
                self.closed = true;
            }
            MapperError::from(e)
        })
    }
}

impl Connection for SqliteConnection {
    fn query<'a>(
        &'a mut self,
        sql: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, MapperResult<Vec<Row>>> {
        Box::pin(async move {
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind_param(query, param);
            }
            let result = query.fetch_all(&mut self.inner).await;
            let rows = self.track(result)?;
            rows.iter().map(decode_row).collect()
        })
    }

    fn execute<'a>(
        &'a mut self,
        sql: &'a str,
        params: &'a [Value],
        return_keys: bool,
    ) -> BoxFuture<'a, MapperResult<ExecuteResult>> {
        Box::pin(async move {
            let mut query = sqlx::query(sql);
            for param in params {
                query = bind_param(query, param);
            }
            let result = query.execute(&mut self.inner).await;
            let done = self.track(result)?;

            let generated_keys = (return_keys && done.rows_affected() > 0).then(|| {
                Row::new().with_column(GENERATED_KEY_COLUMN, Value::Int(done.last_insert_rowid()))
            });
            Ok(ExecuteResult {
                rows_affected: done.rows_affected(),
                generated_keys,
            })
        })
    }

    fn ping(&mut self) -> BoxFuture<'_, MapperResult<()>> {
        Box::pin(async move {
            let result = sqlx::query(LIVENESS_QUERY).execute(&mut self.inner).await;
            self.track(result).map(|_| ())
        })
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Bind a parameter to a SQLite query.
fn bind_param<'q>(
    query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    param: &'q Value,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match param {
        Value::Null => query.bind(None::<String>),
        Value::Bool(v) => query.bind(*v),
        Value::Int(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.as_str()),
        Value::Bytes(v) => query.bind(v.as_slice()),
    }
}

fn decode_row(row: &SqliteRow) -> MapperResult<Row> {
    row.columns()
        .iter()
        .map(|col| -> MapperResult<(String, Value)> {
            Ok((col.name().to_string(), decode_column(row, col.ordinal())?))
        })
        .collect()
}

fn decode_column(row: &SqliteRow, idx: usize) -> MapperResult<Value> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    // the value's storage class wins over the declared column type
    let category = categorize_type(raw.type_info().name());
    let value = match category {
        TypeCategory::Integer => Value::Int(row.try_get_unchecked::<i64, _>(idx)?),
        TypeCategory::Boolean => Value::Bool(row.try_get_unchecked::<bool, _>(idx)?),
        TypeCategory::Float => Value::Float(row.try_get_unchecked::<f64, _>(idx)?),
        TypeCategory::Binary => Value::Bytes(row.try_get_unchecked::<Vec<u8>, _>(idx)?),
        TypeCategory::Text => Value::Text(row.try_get_unchecked::<String, _>(idx)?),
    };
    Ok(value)
}
