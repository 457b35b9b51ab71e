//! Driver contract consumed by the pool and the executor.
//!
//! A [`Driver`] opens physical connections; a [`Connection`] runs statements
//! that have already been compiled to positional `?` markers. Both traits
//! return boxed futures so they can be used as trait objects.

use crate::error::MapperResult;
use crate::models::{ExecuteResult, Row, Value};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

/// Statement used by keep-alive probes.
pub const LIVENESS_QUERY: &str = "SELECT 1";

/// Where and as whom to connect.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    /// Full connection URL (sensitive - not logged).
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl ConnectionParams {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }
}

impl std::fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("url", &"<redacted>")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Opens physical connections.
pub trait Driver: Send + Sync {
    fn connect<'a>(
        &'a self,
        params: &'a ConnectionParams,
    ) -> BoxFuture<'a, MapperResult<Box<dyn Connection>>>;
}

/// One physical database connection.
pub trait Connection: Send {
    /// Run a query and collect every row.
    fn query<'a>(
        &'a mut self,
        sql: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, MapperResult<Vec<Row>>>;

    /// Run a write. When `return_keys` is set the driver reports the
    /// generated-key row, if the database produced one.
    fn execute<'a>(
        &'a mut self,
        sql: &'a str,
        params: &'a [Value],
        return_keys: bool,
    ) -> BoxFuture<'a, MapperResult<ExecuteResult>>;

    /// Issue [`LIVENESS_QUERY`].
    fn ping(&mut self) -> BoxFuture<'_, MapperResult<()>>;

    /// Whether the physical connection is known to be closed.
    fn is_closed(&self) -> bool;
}
