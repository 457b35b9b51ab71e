//! Statement descriptors, template compilation and the compiled registry.

pub mod compiler;
pub mod descriptor;
pub mod registry;

pub use compiler::{CompiledStatement, compile, normalize_field_name};
pub use descriptor::{
    DeleteOptions, ParameterType, ResultMap, ResultMapping, SelectOptions, StatementDescriptor,
    StatementKind, StatementType, WriteOptions,
};
pub use registry::{RegisteredStatement, StatementRegistry};
