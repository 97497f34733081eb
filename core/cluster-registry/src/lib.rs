//! Node Registry (C1, spec §4.1): the current ordered list of [`NodeDescriptor`]s.
use std::sync::Arc;

use tokio::sync::RwLock;

use vigilante_cluster_model::NodeDescriptor;
use vigilante_conf::OrchestratorConf;
use vigilante_conf::QdrantConf;
use vigilante_conf::RegistryMode;
use vigilante_context::Context;
use vigilante_orchestrator_client::Client as OrchestratorClient;
use vigilante_orchestrator_client::PodPhase;

/// Scheme used to reach Qdrant nodes. Vigilante does not configure TLS between itself and
/// Qdrant pods (in-cluster traffic), so this is fixed rather than sourced from configuration.
const NODE_SCHEME: &str = "http";

/// Source-of-truth mapping from node identity to endpoint and orchestrator metadata.
///
/// Two modes, selected by [`RegistryMode`]: `Static` reads a configured seed list; `Discovered`
/// queries the orchestrator for pods matching a label selector (spec §4.1).
pub struct NodeRegistry {
    mode: RegistryMode,
    orchestrator_conf: OrchestratorConf,
    static_nodes: Vec<NodeDescriptor>,
    orchestrator: Option<Arc<OrchestratorClient>>,
    current: RwLock<Vec<NodeDescriptor>>,
}

impl NodeRegistry {
    /// Build a registry from configuration. `orchestrator` must be `Some` when
    /// `mode = Discovered`.
    pub fn new(
        qdrant: &QdrantConf,
        orchestrator_conf: OrchestratorConf,
        orchestrator: Option<Arc<OrchestratorClient>>,
    ) -> Self {
        let static_nodes = qdrant
            .nodes
            .iter()
            .map(|node| NodeDescriptor {
                peer_id: format!("{}:{}", node.host, node.port),
                host: node.host.clone(),
                port: node.port,
                scheme: NODE_SCHEME.into(),
                pod_name: node.pod_name.clone(),
                pod_namespace: node.namespace.clone(),
                stateful_set_name: None,
            })
            .collect();
        NodeRegistry {
            mode: orchestrator_conf.mode,
            orchestrator_conf,
            static_nodes,
            orchestrator,
            current: RwLock::new(Vec::new()),
        }
    }

    /// Refresh the registry for the next Monitor Loop tick (spec §4.4 step 1).
    ///
    /// Discovery failures keep the previous list and log a warning; the registry is never
    /// emptied by a transient orchestrator error (spec §4.1).
    pub async fn refresh(&self, context: &Context) -> Vec<NodeDescriptor> {
        let nodes = match self.mode {
            RegistryMode::Static => self.static_nodes.clone(),
            RegistryMode::Discovered => match self.discover(context).await {
                Ok(nodes) => nodes,
                Err(error) => {
                    slog::warn!(
                        context.logger, "Node discovery failed, keeping previous registry";
                        "error" => %error,
                    );
                    self.current.read().await.clone()
                }
            },
        };
        let mut current = self.current.write().await;
        *current = nodes.clone();
        nodes
    }

    /// The registry's current contents without triggering a refresh.
    pub async fn current(&self) -> Vec<NodeDescriptor> {
        self.current.read().await.clone()
    }

    async fn discover(&self, _context: &Context) -> anyhow::Result<Vec<NodeDescriptor>> {
        let orchestrator = self
            .orchestrator
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("discovered mode requires an orchestrator client"))?;
        let namespace = self
            .orchestrator_conf
            .namespace
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("orchestrator.namespace is required in Discovered mode"))?;
        let selector = self
            .orchestrator_conf
            .label_selector
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("orchestrator.label_selector is required in Discovered mode"))?;

        let pods = orchestrator.list_pods(namespace, selector).await?;
        let port = self.orchestrator_conf.container_port;
        let nodes = pods
            .into_iter()
            .filter(|pod| pod.phase == PodPhase::Running)
            .filter_map(|pod| {
                let host = pod.ip?;
                Some(NodeDescriptor {
                    peer_id: format!("{}:{}", host, port),
                    host,
                    port,
                    scheme: NODE_SCHEME.into(),
                    pod_name: Some(pod.name),
                    pod_namespace: Some(pod.namespace),
                    stateful_set_name: pod.owner_stateful_set,
                })
            })
            .collect();
        Ok(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigilante_conf::QdrantNodeConf;

    fn orchestrator_conf() -> OrchestratorConf {
        OrchestratorConf {
            mode: RegistryMode::Discovered,
            namespace: Some("qdrant".into()),
            label_selector: Some("app=qdrant".into()),
            container_port: 6333,
            storage_root: "/qdrant/storage/collections".into(),
            exec_timeout_seconds: 30,
            recovery_max_seconds: 300,
        }
    }

    #[tokio::test]
    async fn static_mode_returns_configured_seed_list() {
        let qdrant = QdrantConf {
            nodes: vec![QdrantNodeConf {
                host: "qdrant-0.qdrant".into(),
                port: 6333,
                namespace: Some("qdrant".into()),
                pod_name: Some("qdrant-0".into()),
            }],
            ..Default::default()
        };
        let mut conf = orchestrator_conf();
        conf.mode = RegistryMode::Static;
        let registry = NodeRegistry::new(&qdrant, conf, None);
        let context = Context::fixture();
        let nodes = registry.refresh(&context).await;
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].host, "qdrant-0.qdrant");
    }

    #[tokio::test]
    async fn discovery_failure_keeps_previous_list() {
        let qdrant = QdrantConf::default();
        let registry = NodeRegistry::new(&qdrant, orchestrator_conf(), None);
        let context = Context::fixture();
        // Seed a previous list directly, simulating a prior successful discovery.
        {
            let mut current = registry.current.write().await;
            *current = vec![NodeDescriptor {
                peer_id: "10.0.0.1:6333".into(),
                host: "10.0.0.1".into(),
                port: 6333,
                scheme: "http".into(),
                pod_name: None,
                pod_namespace: None,
                stateful_set_name: None,
            }];
        }
        // No orchestrator client configured: discover() always fails.
        let nodes = registry.refresh(&context).await;
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].host, "10.0.0.1");
    }
}
