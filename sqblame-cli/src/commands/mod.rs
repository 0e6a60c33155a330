//! CLI command implementations

pub mod check;
pub mod export;
pub mod secrets;
pub mod server;

pub use check::CheckArgs;
pub use export::ExportArgs;
pub use secrets::SecretsArgs;
