//! Binding between records and rows.
//!
//! - [`Record`] and [`Shape`]: field tables built by [`record!`](crate::record)
//! - [`Parameter`]: placeholder resolution, cache keys, generated-key write-back
//! - [`FromRow`] and the result binder: rows onto records or scalars

pub mod binder;
pub mod parameter;
pub mod record;

pub use binder::{FromRow, bind_record, bind_rows, generated_key};
pub use parameter::{Parameter, bind_parameters};
pub use record::{FieldDescriptor, FromValue, Record, Shape, ToValue};
