//! Factory for Qdrant node API clients.
//!
//! Qdrant exposes one wire protocol (HTTP) for the calls this system needs, so unlike a
//! multi-transport agent registry this is a single factory, not a schema-dispatch table
//! (see `DESIGN.md`).
use std::time::Duration;

use anyhow::Result;

use vigilante_cluster_model::NodeDescriptor;
use vigilante_node_client::Client;
use vigilante_node_client_http::ClientOptions;
use vigilante_node_client_http::HttpClient;

/// Builds node API clients for [`NodeDescriptor`]s discovered by the Node Registry (C1).
#[derive(Clone)]
pub struct NodeClients {
    api_key: Option<String>,
    http_timeout: Duration,
}

impl NodeClients {
    /// Create a client factory using the given API key and per-request timeout (spec §6
    /// `Qdrant.ApiKey`, `Qdrant.HttpTimeoutSeconds`).
    pub fn new(api_key: Option<String>, http_timeout: Duration) -> Self {
        NodeClients {
            api_key,
            http_timeout,
        }
    }

    /// Initialise a client to reach the node described by `descriptor`.
    pub fn client(&self, descriptor: &NodeDescriptor) -> Result<Client> {
        let mut options = ClientOptions::url(descriptor.node_url());
        options.timeout(self.http_timeout);
        let client = HttpClient::with(options.client(), self.api_key.clone())?;
        Ok(Client::from(client))
    }
}
