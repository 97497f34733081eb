//! Operation Executor (C7, spec §4.7): single entry point per operation kind.
//!
//! Grounded on `core/oaction/src/{handler,registry}.rs`'s registry-of-handlers
//! pattern, generalized from a single resumable action invocation (`OActionHandler::invoke`
//! advancing one `OAction` towards a final state across scheduler passes) into direct,
//! synchronous multi-target fan-out: Qdrant operations here are not pluggable action kinds
//! resumed by a task queue, they are a fixed set of methods each immediately dispatching to
//! one or many targets and aggregating the result (see `DESIGN.md`).
use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Context as _;
use anyhow::Result;

use vigilante_cluster_model::NodeDescriptor;
use vigilante_cluster_model::NodeView;
use vigilante_cluster_model::OperationResult;
use vigilante_cluster_model::OperationTargetResult;
use vigilante_cluster_monitor::ModelHandle;
use vigilante_clients_node::NodeClients;
use vigilante_conf::OrchestratorConf;
use vigilante_context::Context;
use vigilante_errors::VigilanteError;
use vigilante_node_client::SnapshotDownload;
use vigilante_orchestrator_client::Client as OrchestratorClient;
use vigilante_orchestrator_client::PodPhase;
use vigilante_orchestrator_client::StatefulSetPatch;

mod requests;

pub use self::requests::CreateSnapshotRequest;
pub use self::requests::DeleteCollectionRequest;
pub use self::requests::DeleteSnapshotRequest;
pub use self::requests::DeletionType;
pub use self::requests::DownloadSnapshotRequest;
pub use self::requests::ManageStatefulSetRequest;
pub use self::requests::PodDeleteRequest;
pub use self::requests::PodRef;
pub use self::requests::RecoverFromSnapshotRequest;
pub use self::requests::ReplicateShardsRequest;
pub use self::requests::Scope;
pub use self::requests::StatefulSetOperation;

/// Container under which Qdrant executes inside its pods. Fixed: the StatefulSet template
/// used to deploy Qdrant names exactly one container.
const QDRANT_CONTAINER: &str = "qdrant";

/// HTTP scheme assumed for nodes resolved from the cluster model (spec §4.1's registry uses
/// the same fixed scheme; in-cluster traffic is not TLS-terminated between Vigilante and
/// Qdrant pods).
const NODE_SCHEME: &str = "http";

/// Dispatches each Qdrant/orchestrator operation kind to its target(s) and aggregates the
/// outcome into an [`OperationResult`] (spec §4.7).
pub struct Operator {
    node_clients: NodeClients,
    orchestrator: std::sync::Arc<OrchestratorClient>,
    orchestrator_conf: OrchestratorConf,
    model: ModelHandle,
}

impl Operator {
    pub fn new(
        node_clients: NodeClients,
        orchestrator: std::sync::Arc<OrchestratorClient>,
        orchestrator_conf: OrchestratorConf,
        model: ModelHandle,
    ) -> Self {
        Operator {
            node_clients,
            orchestrator,
            orchestrator_conf,
            model,
        }
    }

    /// Replicate or move shards between two peers (spec §4.7 "Replicate / Move Shards").
    pub async fn replicate_shards(
        &self,
        _context: &Context,
        request: ReplicateShardsRequest,
    ) -> Result<OperationResult> {
        if request.source_peer_id == request.target_peer_id {
            return Err(VigilanteError::invalid_argument("source equals target").into());
        }
        if request.shard_ids.is_empty() {
            return Err(VigilanteError::invalid_argument("shardIds must not be empty").into());
        }

        let descriptor = self.descriptor_for_peer(&request.source_peer_id)?;
        let client = self.node_clients.client(&descriptor)?;

        let mut results = BTreeMap::new();
        for shard_id in request.shard_ids {
            let outcome = client
                .replicate_shard(
                    &request.collection_name,
                    shard_id,
                    &request.target_peer_id,
                    request.is_move,
                )
                .await;
            let result = match outcome {
                Ok(outcome) => OperationTargetResult {
                    success: outcome.accepted,
                    error: (!outcome.accepted).then(|| "node did not accept request".to_string()),
                },
                Err(error) => OperationTargetResult {
                    success: false,
                    error: Some(error.to_string()),
                },
            };
            results.insert(format!("shard-{shard_id}"), result);
        }
        Ok(OperationResult::aggregate(results))
    }

    /// Delete a collection via the database API or directly on disk (spec §4.7 "Delete
    /// Collection").
    pub async fn delete_collection(
        &self,
        context: &Context,
        request: DeleteCollectionRequest,
    ) -> Result<OperationResult> {
        validate_collection_name(&request.collection_name)?;
        match (request.mode, request.scope) {
            (DeletionType::Api, Scope::SingleNode) => {
                let node_url = request
                    .node_url
                    .as_deref()
                    .ok_or_else(|| VigilanteError::invalid_argument("nodeUrl is required for Api/SingleNode"))?;
                let descriptor = descriptor_from_url(node_url)?;
                let result = self.api_delete_collection(&descriptor, &request.collection_name).await;
                Ok(OperationResult::aggregate(BTreeMap::from([(descriptor.peer_id, result)])))
            }
            (DeletionType::Api, Scope::Cluster) => {
                let descriptor = self
                    .any_reachable_descriptor()
                    .ok_or_else(|| VigilanteError::unreachable("no reachable node to delete collection on"))?;
                let result = self.api_delete_collection(&descriptor, &request.collection_name).await;
                Ok(OperationResult::aggregate(BTreeMap::from([(descriptor.peer_id, result)])))
            }
            (DeletionType::Disk, Scope::SingleNode) => {
                let pod_ref = request
                    .pod_ref
                    .ok_or_else(|| VigilanteError::invalid_argument("podRef is required for Disk/SingleNode"))?;
                let namespace = self.namespace_for(pod_ref.namespace.as_deref())?;
                let result = self
                    .disk_delete_collection(context, &pod_ref.pod_name, namespace, &request.collection_name)
                    .await;
                Ok(OperationResult::aggregate(BTreeMap::from([(pod_ref.pod_name, result)])))
            }
            (DeletionType::Disk, Scope::Cluster) => {
                let namespace = self.namespace_for(None)?.to_string();
                let pods = self
                    .orchestrator
                    .list_pods(&namespace, self.label_selector()?)
                    .await?;
                let mut results = BTreeMap::new();
                for pod in pods {
                    let result = self
                        .disk_delete_collection(context, &pod.name, &pod.namespace, &request.collection_name)
                        .await;
                    results.insert(pod.name, result);
                }
                Ok(OperationResult::aggregate(results))
            }
        }
    }

    /// Create a snapshot of a collection (spec §4.7 "Create Snapshot").
    pub async fn create_snapshot(&self, request: CreateSnapshotRequest) -> Result<OperationResult> {
        validate_collection_name(&request.collection_name)?;
        let targets = match request.scope {
            Scope::SingleNode => {
                let node_url = request
                    .node_url
                    .as_deref()
                    .ok_or_else(|| VigilanteError::invalid_argument("nodeUrl is required for SingleNode"))?;
                vec![descriptor_from_url(node_url)?]
            }
            Scope::Cluster => self.all_reachable_descriptors(),
        };
        if targets.is_empty() {
            return Err(VigilanteError::unreachable("no reachable node to create a snapshot on").into());
        }

        let mut results = BTreeMap::new();
        for descriptor in targets {
            let result = match self.node_clients.client(&descriptor) {
                Ok(client) => match client.create_snapshot(&request.collection_name).await {
                    Ok(outcome) => OperationTargetResult {
                        success: outcome.accepted,
                        error: (!outcome.accepted).then(|| "node did not accept request".to_string()),
                    },
                    Err(error) => OperationTargetResult {
                        success: false,
                        error: Some(error.to_string()),
                    },
                },
                Err(error) => OperationTargetResult {
                    success: false,
                    error: Some(error.to_string()),
                },
            };
            results.insert(descriptor.peer_id, result);
        }
        Ok(OperationResult::aggregate(results))
    }

    /// Recover a collection from a snapshot, by name or by URL, optionally blocking until the
    /// collection reappears (spec §4.7 "Recover From Snapshot").
    pub async fn recover_from_snapshot(&self, request: RecoverFromSnapshotRequest) -> Result<OperationResult> {
        validate_collection_name(&request.collection_name)?;
        let descriptor = descriptor_from_url(&request.node_url)?;
        let client = self.node_clients.client(&descriptor)?;

        let outcome = match (&request.snapshot_name, &request.snapshot_url) {
            (Some(name), None) => client.recover_snapshot(&request.collection_name, name).await?,
            (None, Some(url)) => {
                client
                    .recover_snapshot_from_url(&request.collection_name, url, request.checksum.clone())
                    .await?
            }
            _ => {
                return Err(VigilanteError::invalid_argument(
                    "exactly one of snapshotName or snapshotUrl must be set",
                )
                .into())
            }
        };

        if !outcome.accepted {
            let result = OperationTargetResult {
                success: false,
                error: Some("node did not accept recovery request".to_string()),
            };
            return Ok(OperationResult::aggregate(BTreeMap::from([(descriptor.peer_id, result)])));
        }

        if request.wait_for_result {
            let deadline = Duration::from_secs(self.orchestrator_conf.recovery_max_seconds);
            let poll = async {
                loop {
                    if client.collection_exists(&request.collection_name).await.unwrap_or(false) {
                        return true;
                    }
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            };
            let appeared = tokio::time::timeout(deadline, poll).await.unwrap_or(false);
            let result = OperationTargetResult {
                success: appeared,
                error: (!appeared).then(|| "collection did not reappear within T_recovery_max".to_string()),
            };
            return Ok(OperationResult::aggregate(BTreeMap::from([(descriptor.peer_id, result)])));
        }

        let result = OperationTargetResult { success: true, error: None };
        Ok(OperationResult::aggregate(BTreeMap::from([(descriptor.peer_id, result)])))
    }

    /// Stream a snapshot's bytes, falling back to an exec-based disk copy on API failure
    /// (spec §4.7 "Download Snapshot"). Both paths preserve byte-exactness; no recoding.
    pub async fn download_snapshot(&self, request: DownloadSnapshotRequest) -> Result<SnapshotDownload> {
        validate_collection_name(&request.collection_name)?;
        let descriptor = descriptor_from_url(&request.node_url)?;
        let client = self.node_clients.client(&descriptor)?;

        match client.download_snapshot(&request.collection_name, &request.snapshot_name).await {
            Ok(download) => Ok(download),
            Err(api_error) => {
                let pod_ref = request.pod_ref.ok_or(api_error).context("API download failed and no podRef given for disk fallback")?;
                self.disk_download_snapshot(&pod_ref, &request.collection_name, &request.snapshot_name).await
            }
        }
    }

    /// Delete a snapshot via the database API or an on-disk `rm` (spec §4.7 "Delete
    /// Snapshot").
    pub async fn delete_snapshot(&self, request: DeleteSnapshotRequest) -> Result<OperationResult> {
        validate_collection_name(&request.collection_name)?;
        match request.source {
            DeletionType::Api => {
                let node_url = request
                    .node_url
                    .as_deref()
                    .ok_or_else(|| VigilanteError::invalid_argument("nodeUrl is required for Api deletion"))?;
                let descriptor = descriptor_from_url(node_url)?;
                let client = self.node_clients.client(&descriptor)?;
                let result = match client.delete_snapshot(&request.collection_name, &request.snapshot_name).await {
                    Ok(outcome) => OperationTargetResult {
                        success: outcome.accepted,
                        error: (!outcome.accepted).then(|| "node did not accept request".to_string()),
                    },
                    Err(error) => OperationTargetResult { success: false, error: Some(error.to_string()) },
                };
                Ok(OperationResult::aggregate(BTreeMap::from([(descriptor.peer_id, result)])))
            }
            DeletionType::Disk => {
                let pod_ref = request
                    .pod_ref
                    .ok_or_else(|| VigilanteError::invalid_argument("podRef is required for Disk deletion"))?;
                let namespace = self.namespace_for(pod_ref.namespace.as_deref())?.to_string();
                let path = self.snapshot_path(&request.collection_name, &request.snapshot_name);
                let result = self
                    .exec_ok(&namespace, &pod_ref.pod_name, vec!["rm".into(), "-f".into(), path])
                    .await;
                Ok(OperationResult::aggregate(BTreeMap::from([(pod_ref.pod_name, result)])))
            }
        }
    }

    /// Delete a pod; the owning `StatefulSet` controller recreates it (spec §4.7 "Pod
    /// Delete").
    pub async fn pod_delete(&self, request: PodDeleteRequest) -> Result<OperationResult> {
        let namespace = self.namespace_for(request.namespace.as_deref())?.to_string();
        let result = match self.orchestrator.delete_pod(&namespace, &request.pod_name).await {
            Ok(()) => OperationTargetResult { success: true, error: None },
            Err(error) => OperationTargetResult { success: false, error: Some(error.to_string()) },
        };
        Ok(OperationResult::aggregate(BTreeMap::from([(request.pod_name, result)])))
    }

    /// Trigger a rollout restart or scale a `StatefulSet` (spec §4.7 "Manage Stateful-Set").
    pub async fn manage_stateful_set(&self, request: ManageStatefulSetRequest) -> Result<OperationResult> {
        let namespace = self.namespace_for(request.namespace.as_deref())?.to_string();
        let patch = match request.op {
            StatefulSetOperation::Rollout => StatefulSetPatch::Rollout {
                restarted_at: time::OffsetDateTime::now_utc()
                    .format(&time::format_description::well_known::Rfc3339)
                    .context("formatting restartedAt timestamp")?,
            },
            StatefulSetOperation::Scale => {
                let replicas = request
                    .replicas
                    .ok_or_else(|| VigilanteError::invalid_argument("replicas is required for Scale"))?;
                if replicas < 0 {
                    return Err(VigilanteError::invalid_argument("replicas must be >= 0").into());
                }
                StatefulSetPatch::Scale { replicas }
            }
        };
        let result = match self.orchestrator.patch_stateful_set(&namespace, &request.name, patch).await {
            Ok(()) => OperationTargetResult { success: true, error: None },
            Err(error) => OperationTargetResult { success: false, error: Some(error.to_string()) },
        };
        Ok(OperationResult::aggregate(BTreeMap::from([(request.name, result)])))
    }

    // -- helpers --

    fn descriptor_for_peer(&self, peer_id: &str) -> Result<NodeDescriptor> {
        let model = self.model.load();
        let view = model
            .nodes
            .iter()
            .find(|node| node.peer_id == peer_id)
            .ok_or_else(|| VigilanteError::not_found(format!("peer '{peer_id}' not found")))?;
        Ok(descriptor_from_view(view))
    }

    fn any_reachable_descriptor(&self) -> Option<NodeDescriptor> {
        let model = self.model.load();
        model.nodes.iter().find(|node| node.reachable).map(descriptor_from_view)
    }

    fn all_reachable_descriptors(&self) -> Vec<NodeDescriptor> {
        let model = self.model.load();
        model.nodes.iter().filter(|node| node.reachable).map(descriptor_from_view).collect()
    }

    fn namespace_for<'a>(&'a self, explicit: Option<&'a str>) -> Result<&'a str> {
        if let Some(namespace) = explicit {
            return Ok(namespace);
        }
        self.orchestrator_conf
            .namespace
            .as_deref()
            .ok_or_else(|| VigilanteError::invalid_argument("namespace is required").into())
    }

    fn label_selector(&self) -> Result<&str> {
        self.orchestrator_conf
            .label_selector
            .as_deref()
            .ok_or_else(|| VigilanteError::invalid_argument("orchestrator.labelSelector is not configured").into())
    }

    fn snapshot_path(&self, collection_name: &str, snapshot_name: &str) -> String {
        format!(
            "{}/{}/snapshots/{}",
            self.orchestrator_conf.storage_root, collection_name, snapshot_name
        )
    }

    async fn api_delete_collection(&self, descriptor: &NodeDescriptor, collection_name: &str) -> OperationTargetResult {
        let client = match self.node_clients.client(descriptor) {
            Ok(client) => client,
            Err(error) => return OperationTargetResult { success: false, error: Some(error.to_string()) },
        };
        // The HTTP client already treats a 404 as `accepted=true` (spec §8 invariant 2:
        // idempotent delete), so only transport/5xx failures reach the `Err` arm here.
        match client.delete_collection(collection_name).await {
            Ok(outcome) => OperationTargetResult { success: outcome.accepted, error: None },
            Err(error) => OperationTargetResult { success: false, error: Some(error.to_string()) },
        }
    }

    async fn disk_delete_collection(
        &self,
        context: &Context,
        pod_name: &str,
        namespace: &str,
        collection_name: &str,
    ) -> OperationTargetResult {
        match self.orchestrator.get_pod(namespace, pod_name).await {
            Ok(pod) if pod.phase != PodPhase::Running => {
                slog::warn!(
                    context.logger, "Refusing disk-mode delete: pod is not Running";
                    "pod" => pod_name, "collection" => collection_name,
                );
                return OperationTargetResult {
                    success: false,
                    error: Some(format!("pod {pod_name} is not Running")),
                };
            }
            Err(error) => return OperationTargetResult { success: false, error: Some(error.to_string()) },
            Ok(_) => {}
        }
        let dir = format!("{}/{}", self.orchestrator_conf.storage_root, collection_name);
        self.exec_ok(namespace, pod_name, vec!["rm".into(), "-rf".into(), dir]).await
    }

    async fn disk_download_snapshot(
        &self,
        pod_ref: &PodRef,
        collection_name: &str,
        snapshot_name: &str,
    ) -> Result<SnapshotDownload> {
        let namespace = self.namespace_for(pod_ref.namespace.as_deref())?.to_string();
        let path = self.snapshot_path(collection_name, snapshot_name);
        let output = tokio::time::timeout(
            Duration::from_secs(self.orchestrator_conf.exec_timeout_seconds),
            self.orchestrator
                .exec(&namespace, &pod_ref.pod_name, QDRANT_CONTAINER, vec!["cat".into(), path]),
        )
        .await
        .context("exec-based snapshot copy timed out")??;
        if !output.success() {
            anyhow::bail!(
                "exec-based snapshot copy failed: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }
        let content_length = Some(output.stdout.len() as u64);
        let bytes = futures_util::stream::once(async move { Ok(bytes::Bytes::from(output.stdout)) });
        Ok(SnapshotDownload {
            content_length,
            bytes: Box::pin(bytes),
        })
    }

    async fn exec_ok(&self, namespace: &str, pod_name: &str, argv: Vec<String>) -> OperationTargetResult {
        let exec = tokio::time::timeout(
            Duration::from_secs(self.orchestrator_conf.exec_timeout_seconds),
            self.orchestrator.exec(namespace, pod_name, QDRANT_CONTAINER, argv),
        )
        .await;
        match exec {
            Ok(Ok(output)) if output.success() => OperationTargetResult { success: true, error: None },
            Ok(Ok(output)) => OperationTargetResult {
                success: false,
                error: Some(String::from_utf8_lossy(&output.stderr).to_string()),
            },
            Ok(Err(error)) => OperationTargetResult { success: false, error: Some(error.to_string()) },
            Err(_) => OperationTargetResult { success: false, error: Some("exec timed out".to_string()) },
        }
    }
}

fn descriptor_from_view(view: &NodeView) -> NodeDescriptor {
    NodeDescriptor {
        peer_id: view.peer_id.clone(),
        host: view.host.clone(),
        port: view.port,
        scheme: NODE_SCHEME.to_string(),
        pod_name: view.pod_name.clone(),
        pod_namespace: view.pod_namespace.clone(),
        stateful_set_name: view.stateful_set_name.clone(),
    }
}

/// Build a [`NodeDescriptor`] from a caller-supplied `nodeUrl` (spec §4.7 "Api/SingleNode").
/// `peerId` is set to the URL itself: the caller addressed this node by endpoint, not cluster
/// identity, and the response is keyed accordingly in `OperationResult.results`.
fn descriptor_from_url(node_url: &str) -> Result<NodeDescriptor> {
    let parsed = url::Url::parse(node_url)
        .map_err(|error| VigilanteError::invalid_argument(format!("invalid nodeUrl: {error}")))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| VigilanteError::invalid_argument("nodeUrl has no host"))?
        .to_string();
    let port = parsed
        .port_or_known_default()
        .ok_or_else(|| VigilanteError::invalid_argument("nodeUrl has no port"))?;
    Ok(NodeDescriptor {
        peer_id: node_url.to_string(),
        host,
        port,
        scheme: parsed.scheme().to_string(),
        pod_name: None,
        pod_namespace: None,
        stateful_set_name: None,
    })
}

/// Collection names with path separators are rejected (spec §6 "Storage layout on pod disk").
fn validate_collection_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(VigilanteError::invalid_argument("collectionName must not be empty").into());
    }
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(VigilanteError::invalid_argument("collectionName must not contain path separators").into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use vigilante_orchestrator_client::fixture::Client as OrchestratorFixture;

    fn operator() -> Operator {
        let orchestrator = vigilante_orchestrator_client::Client::from(OrchestratorFixture::default());
        let model = model_handle_for_test();
        Operator::new(
            NodeClients::new(None, Duration::from_secs(1)),
            Arc::new(orchestrator),
            OrchestratorConf::default(),
            model,
        )
    }

    // `ModelHandle` has no public constructor outside `vigilante-cluster-monitor`; build one
    // through a throwaway `Monitor` and read its handle, which is the only way tests in this
    // crate can seed a `ClusterModel` for `Operator` to resolve peers against.
    fn model_handle_for_test() -> ModelHandle {
        let registry = Arc::new(vigilante_cluster_registry::NodeRegistry::new(
            &vigilante_conf::QdrantConf::default(),
            OrchestratorConf::default(),
            None,
        ));
        let prober = Arc::new(vigilante_cluster_prober::Prober::new(
            NodeClients::new(None, Duration::from_secs(1)),
            Duration::from_secs(1),
            OrchestratorConf::default(),
            None,
        ));
        let monitor = vigilante_cluster_monitor::Monitor::new(
            registry,
            prober,
            Duration::from_secs(30),
            Duration::from_secs(1),
            None,
        );
        monitor.handle()
    }

    #[tokio::test]
    async fn s4_replicate_shards_rejects_source_equals_target() {
        let operator = operator();
        let context = Context::fixture();
        let request = ReplicateShardsRequest {
            source_peer_id: "P1".into(),
            target_peer_id: "P1".into(),
            collection_name: "docs".into(),
            shard_ids: vec![0],
            is_move: false,
        };
        let error = operator.replicate_shards(&context, request).await.unwrap_err();
        let (kind, _) = vigilante_errors::classify(&error);
        assert_eq!(kind, vigilante_errors::ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn replicate_shards_rejects_empty_shard_ids() {
        let operator = operator();
        let context = Context::fixture();
        let request = ReplicateShardsRequest {
            source_peer_id: "P1".into(),
            target_peer_id: "P2".into(),
            collection_name: "docs".into(),
            shard_ids: vec![],
            is_move: false,
        };
        let error = operator.replicate_shards(&context, request).await.unwrap_err();
        let (kind, _) = vigilante_errors::classify(&error);
        assert_eq!(kind, vigilante_errors::ErrorKind::InvalidArgument);
    }

    #[test]
    fn validate_collection_name_rejects_path_separators() {
        assert!(validate_collection_name("../etc").is_err());
        assert!(validate_collection_name("a/b").is_err());
        assert!(validate_collection_name("docs").is_ok());
    }

    #[test]
    fn descriptor_from_url_parses_host_and_port() {
        let descriptor = descriptor_from_url("http://10.0.0.5:6333").unwrap();
        assert_eq!(descriptor.host, "10.0.0.5");
        assert_eq!(descriptor.port, 6333);
    }

    #[tokio::test]
    async fn s5_disk_delete_collection_cluster_partial_failure() {
        use vigilante_orchestrator_client::ExecOutput;
        use vigilante_orchestrator_client::PodInfo;
        use vigilante_orchestrator_client::PodPhase;

        let fixture = OrchestratorFixture::default();
        for name in ["qdrant-0", "qdrant-1", "qdrant-2"] {
            fixture.pod(PodInfo {
                name: name.into(),
                namespace: "qdrant".into(),
                phase: PodPhase::Running,
                ..Default::default()
            });
        }
        fixture.exec_result("qdrant", "qdrant-0", ExecOutput { exit_code: 0, ..Default::default() });
        fixture.exec_result("qdrant", "qdrant-1", ExecOutput { exit_code: 0, ..Default::default() });
        fixture.exec_result(
            "qdrant",
            "qdrant-2",
            ExecOutput {
                exit_code: 1,
                stderr: b"disk full".to_vec(),
                ..Default::default()
            },
        );

        let conf = OrchestratorConf {
            namespace: Some("qdrant".into()),
            label_selector: Some("app=qdrant".into()),
            ..Default::default()
        };
        let orchestrator = vigilante_orchestrator_client::Client::from(fixture);
        let operator = Operator::new(
            NodeClients::new(None, Duration::from_secs(1)),
            Arc::new(orchestrator),
            conf,
            model_handle_for_test(),
        );

        let context = Context::fixture();
        let request = DeleteCollectionRequest {
            collection_name: "docs".into(),
            mode: DeletionType::Disk,
            scope: Scope::Cluster,
            node_url: None,
            pod_ref: None,
        };
        let result = operator.delete_collection(&context, request).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.message, "2/3 targets succeeded (1 failed)");
        assert_eq!(result.results.len(), 3);
        assert!(result.results["qdrant-2"].error.as_deref().unwrap().contains("disk full"));
    }

    #[tokio::test]
    async fn s6_create_snapshot_is_idempotent_across_repeated_calls() {
        let fixture = vigilante_node_client::fixture::Client::new("P1");
        let client = vigilante_node_client::Client::from(fixture);
        // `create_snapshot` on the fixture node unconditionally appends a new snapshot entry
        // and always reports `accepted`, matching the node API's idempotent-accept contract
        // (spec §8 invariant 2): calling it twice must not turn the second call into a failure.
        let first = client.create_snapshot("docs").await.unwrap();
        let second = client.create_snapshot("docs").await.unwrap();
        assert!(first.accepted);
        assert!(second.accepted);

        let snapshots = client.collection_snapshots("docs").await.unwrap();
        assert_eq!(snapshots.len(), 2);
        assert!(snapshots.iter().all(|snapshot| snapshot.name == "docs-snapshot"));
    }
}
