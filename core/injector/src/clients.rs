//! Container for the client handles shared across Vigilante's components.
use std::sync::Arc;

use vigilante_clients_node::NodeClients;
use vigilante_objectstore_client::ObjectStoreClient;
use vigilante_orchestrator_client::Client as OrchestratorClient;

/// Container for all client handles to be injected into other components.
#[derive(Clone)]
pub struct Clients {
    /// Factory for Qdrant node API clients, one per [`NodeDescriptor`](vigilante_cluster_model::NodeDescriptor).
    pub node: NodeClients,

    /// Shared client for the container orchestrator.
    pub orchestrator: Arc<OrchestratorClient>,

    /// Shared client for presigning snapshot object-store URLs, if S3 is configured.
    pub objectstore: Option<Arc<ObjectStoreClient>>,
}
