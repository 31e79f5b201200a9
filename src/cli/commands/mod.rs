//! CLI command implementations

pub mod config;
pub mod package;
pub mod publish;

pub use config::execute as config;
pub use package::execute as package;
pub use publish::execute as publish;
