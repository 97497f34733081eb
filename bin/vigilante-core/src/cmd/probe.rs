//! Run one Node Registry refresh and Node Prober fan-out, print the resulting cluster model.
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as AnyhowContext;
use anyhow::Result;

use vigilante_clients_node::NodeClients;
use vigilante_clients_orchestrator::OrchestratorClients;
use vigilante_cluster_model::fold;
use vigilante_cluster_prober::Prober;
use vigilante_cluster_registry::NodeRegistry;
use vigilante_conf::Conf;
use vigilante_context::Context;
use vigilante_orchestrator_client::Client as OrchestratorClient;

use super::Cli;

/// Run one Monitor Loop tick outside of a running server and print the resulting cluster
/// model as JSON, to diagnose connectivity without starting the HTTP API or Monitor Loop.
pub async fn run(_cli: Cli, conf: Conf) -> Result<()> {
    let logger = slog::Logger::root(slog::Discard, slog::o!());
    let context = Context::root(logger).build();

    let orchestrator = OrchestratorClients::factory(&conf.orchestrator)
        .await
        .context("failed to initialise the container orchestrator client")?;
    let orchestrator: Arc<OrchestratorClient> = Arc::new(orchestrator);

    let http_timeout = Duration::from_secs(conf.qdrant.http_timeout_seconds);
    let node_clients = NodeClients::new(conf.qdrant.api_key.clone(), http_timeout);

    let registry = NodeRegistry::new(&conf.qdrant, conf.orchestrator.clone(), Some(Arc::clone(&orchestrator)));
    let prober = Prober::new(node_clients, http_timeout, conf.orchestrator.clone(), Some(orchestrator));

    let descriptors = registry.refresh(&context).await;
    let mut samples = Vec::with_capacity(descriptors.len());
    for descriptor in &descriptors {
        samples.push(prober.probe(&context, descriptor).await);
    }

    let model = fold(samples);
    let json = serde_json::to_string_pretty(&model)?;
    println!("{json}");
    Ok(())
}
