//! Vigilante process configuration object and loader.
mod loading;
mod object;
mod runtime;

pub use self::loading::load;
pub use self::loading::Error;
pub use self::object::Conf;
pub use self::object::OrchestratorConf;
pub use self::object::QdrantConf;
pub use self::object::QdrantNodeConf;
pub use self::object::RegistryMode;
pub use self::object::S3Conf;
pub use self::runtime::RuntimeConf;
