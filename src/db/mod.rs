//! Database access layer.
//!
//! - Driver contract and the bundled SQLite driver
//! - Ring-buffer free list
//! - Connection pool with keep-alive and leak detection
//! - Pooled and unpooled data sources

pub mod data_source;
pub mod driver;
pub mod pool;
pub mod ring_buffer;
pub mod sqlite;

pub use data_source::{DataSource, Lease, PooledDataSource, UnpooledDataSource};
pub use driver::{Connection, ConnectionParams, Driver, LIVENESS_QUERY};
pub use pool::{ConnectionInfo, ConnectionPool, ConnectionState, LeakReport, PoolStatus, PooledConnection};
pub use ring_buffer::RingBuffer;
pub use sqlite::{SqliteConnection, SqliteDriver};
