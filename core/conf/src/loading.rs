//! Load configuration from files, with environment variable overrides applied on top.
use std::fs::File;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;

use crate::object::QdrantNodeConf;
use crate::object::S3Conf;
use crate::Conf;

/// Errors handling Vigilante configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unable to decode configuration from file at the given path.
    #[error("unable to decode configuration from file at '{0}'")]
    Decode(String),

    /// Unable to read configuration file at the given path.
    #[error("unable to read configuration file at '{0}'")]
    Open(String),

    /// Configuration file not found at the given path.
    #[error("configuration file not found at '{0}'")]
    PathNotFound(String),
}

/// Load process configuration from the specified path, then apply environment overrides.
pub fn load(path: &str) -> Result<Conf> {
    // Check if the configuration file exists and return the default if it does not.
    if !PathBuf::from(path).exists() {
        let error = Error::PathNotFound(path.to_string());
        let error = anyhow::anyhow!(error);
        return Err(error);
    }

    // Load and deserialize the configuration.
    let file = File::open(path).with_context(|| Error::Open(path.into()))?;
    let mut conf: Conf =
        serde_yaml::from_reader(file).with_context(|| Error::Decode(path.into()))?;
    apply_env_overrides(&mut conf);
    Ok(conf)
}

/// Overlay the small, fixed set of environment variable overrides named in spec §6.
///
/// `QDRANT_NODES` is a comma separated list of `host:port` pairs and replaces the entire
/// static seed list; `S3__*` variables override the matching `Qdrant.S3.*` key, creating the
/// `S3` section if the YAML file did not configure one.
fn apply_env_overrides(conf: &mut Conf) {
    if let Ok(nodes) = std::env::var("QDRANT_NODES") {
        let nodes: Vec<QdrantNodeConf> = nodes
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .filter_map(|entry| {
                let (host, port) = entry.rsplit_once(':')?;
                let port = port.parse().ok()?;
                Some(QdrantNodeConf {
                    host: host.to_string(),
                    port,
                    namespace: None,
                    pod_name: None,
                })
            })
            .collect();
        if !nodes.is_empty() {
            conf.qdrant.nodes = nodes;
        }
    }

    let endpoint = std::env::var("S3__EndpointUrl").ok();
    let access_key = std::env::var("S3__AccessKey").ok();
    let secret_key = std::env::var("S3__SecretKey").ok();
    if endpoint.is_some() || access_key.is_some() || secret_key.is_some() {
        let mut s3 = conf.qdrant.s3.take().unwrap_or(S3Conf {
            endpoint_url: String::new(),
            access_key: String::new(),
            secret_key: String::new(),
            region: "default".into(),
        });
        if let Some(endpoint) = endpoint {
            s3.endpoint_url = endpoint;
        }
        if let Some(access_key) = access_key {
            s3.access_key = access_key;
        }
        if let Some(secret_key) = secret_key {
            s3.secret_key = secret_key;
        }
        conf.qdrant.s3 = Some(s3);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_parse_node_list() {
        std::env::set_var("QDRANT_NODES", "a:6333, b:6334");
        let mut conf = Conf::default();
        apply_env_overrides(&mut conf);
        std::env::remove_var("QDRANT_NODES");

        assert_eq!(conf.qdrant.nodes.len(), 2);
        assert_eq!(conf.qdrant.nodes[0].host, "a");
        assert_eq!(conf.qdrant.nodes[0].port, 6333);
        assert_eq!(conf.qdrant.nodes[1].host, "b");
        assert_eq!(conf.qdrant.nodes[1].port, 6334);
    }

    #[test]
    fn overrides_create_s3_section() {
        std::env::set_var("S3__EndpointUrl", "https://s3.example.com");
        std::env::set_var("S3__AccessKey", "key");
        std::env::set_var("S3__SecretKey", "secret");
        let mut conf = Conf::default();
        apply_env_overrides(&mut conf);
        std::env::remove_var("S3__EndpointUrl");
        std::env::remove_var("S3__AccessKey");
        std::env::remove_var("S3__SecretKey");

        let s3 = conf.qdrant.s3.expect("s3 section should be created");
        assert_eq!(s3.endpoint_url, "https://s3.example.com");
        assert_eq!(s3.access_key, "key");
        assert_eq!(s3.secret_key, "secret");
        assert_eq!(s3.region, "default");
    }
}
