//! Sessions and statement execution.

pub mod executor;
pub mod factory;
#[allow(clippy::module_inception)]
pub mod session;

pub use executor::SessionExecutor;
pub use factory::SessionFactory;
pub use session::Session;
