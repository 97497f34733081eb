//! Initialisation logic for Vigilante processes.
mod generic;
mod server;

pub use self::generic::GenericInit;
pub use self::server::Server;

/// ID of the vigilante-core release in sentry recommanded format.
const RELEASE_ID: &str = concat!(env!("CARGO_PKG_NAME"), "@", env!("CARGO_PKG_VERSION"));
