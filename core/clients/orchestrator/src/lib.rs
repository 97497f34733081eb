//! Factory for the container-orchestrator client.
//!
//! Vigilante targets one orchestrator kind (Kubernetes), so unlike a schema-dispatch
//! `PlatformClients` registry this is a single factory (see `DESIGN.md`).
use anyhow::Result;

use vigilante_conf::OrchestratorConf;
use vigilante_orchestrator_client::Client;
use vigilante_orchestrator_client_kube::KubeClient;

/// Builds the [`Client`] used to reach the container orchestrator.
pub struct OrchestratorClients;

impl OrchestratorClients {
    /// Initialise a client from the configured orchestrator settings (spec §6 "Orchestrator
    /// interface (abstracted)").
    pub async fn factory(conf: &OrchestratorConf) -> Result<Client> {
        let client = KubeClient::connect(conf).await?;
        Ok(Client::from(client))
    }
}
