//! Data models shared by drivers and the execution engine.

pub mod row;
pub mod value;

pub use row::{ExecuteResult, Row, WriteResult};
pub use value::Value;
