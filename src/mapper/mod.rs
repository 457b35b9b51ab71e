//! Repository contracts: namespaces, dispatch and the `mapper!` macro.

pub mod dispatcher;
mod macros;
pub mod namespace;

pub use dispatcher::{MapperContract, MapperDispatcher, MethodSignature};
pub use namespace::Namespace;
