//! sqlmapper
//!
//! A small SQL-mapping runtime: statements declared with named `#{field}`
//! placeholders are compiled once, executed over pooled connections, and their
//! rows bound onto plain records by normalized field name. Cacheable SELECTs
//! are memoized per namespace in FIFO or generational caches.
//!
//! ```ignore
//! let factory = SessionFactory::build(config, Arc::new(SqliteDriver::new())).await?;
//! let session = factory.open_session();
//! let employee: Option<Employee> = session.select_one("getEmployeeById", &542i64).await?;
//! ```

pub mod binding;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod mapper;
pub mod models;
pub mod session;
pub mod statement;

pub use binding::{FromRow, Parameter, Record};
pub use config::{Configuration, EnvironmentConfig, MapperConfig};
pub use db::{ConnectionParams, Driver, SqliteDriver};
pub use error::{MapperError, MapperResult};
pub use mapper::MapperContract;
pub use models::{Row, Value, WriteResult};
pub use session::{Session, SessionFactory};
