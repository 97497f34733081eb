//! Plain data types making up the Cluster Coordinator model (spec §3).
use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

/// Shard identifier, unique within a collection.
pub type ShardId = u32;

/// Identity and network/orchestrator coordinates of one Qdrant cluster member.
///
/// Immutable per refresh cycle. `peerId` is globally unique within the cluster; `(host,
/// port)` is unique among healthy nodes (spec §3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDescriptor {
    pub peer_id: String,
    pub host: String,
    pub port: u16,
    pub scheme: String,
    #[serde(default)]
    pub pod_name: Option<String>,
    #[serde(default)]
    pub pod_namespace: Option<String>,
    #[serde(default)]
    pub stateful_set_name: Option<String>,
}

impl NodeDescriptor {
    /// Base URL to reach this node's HTTP API.
    pub fn node_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// Lifecycle label for one shard of one collection on one peer (spec §3).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ShardState {
    Active,
    Initializing,
    Dead,
    Listener,
    PartialSnapshot,
    Partial,
    Resharding,
}

impl ShardState {
    /// Whether this state is considered fully healthy.
    pub fn is_active(self) -> bool {
        matches!(self, ShardState::Active)
    }
}

impl std::fmt::Display for ShardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ShardState::Active => "Active",
            ShardState::Initializing => "Initializing",
            ShardState::Dead => "Dead",
            ShardState::Listener => "Listener",
            ShardState::PartialSnapshot => "PartialSnapshot",
            ShardState::Partial => "Partial",
            ShardState::Resharding => "Resharding",
        };
        write!(f, "{}", text)
    }
}

/// An in-progress outgoing shard transfer reported by a node (spec §3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShardTransfer {
    pub shard_id: ShardId,
    pub to: String,
    pub is_sync: bool,
}

/// One node's report about one collection it hosts (spec §3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionReport {
    pub name: String,
    pub size_bytes: u64,
    pub shards: Vec<ShardId>,
    pub shard_states: BTreeMap<ShardId, ShardState>,
    pub outgoing_transfers: Vec<ShardTransfer>,
    /// Per-shard size in bytes, when the node's collection-info response carries that
    /// granularity. Used by the Collection Aggregator to avoid double counting replicated
    /// shards in `totalSizeBytes` (spec §9 Open Question, resolved in `DESIGN.md`).
    #[serde(default)]
    pub shard_size_bytes: BTreeMap<ShardId, u64>,
}

/// Where a [`SnapshotEntry`] was observed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum SnapshotSource {
    Api,
    Disk,
}

/// A point-in-time archive of a collection on one peer (spec §3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
    pub collection_name: String,
    pub snapshot_name: String,
    pub size_bytes: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub source: SnapshotSource,
    pub peer_id: String,
    pub node_url: String,
    #[serde(default)]
    pub pod_name: Option<String>,
    #[serde(default)]
    pub pod_namespace: Option<String>,
    #[serde(default)]
    pub checksum: Option<String>,
}

/// One observation of a node at a point in time (spec §3).
///
/// Owned transiently by the Node Prober; discarded after it is folded into a
/// [`ClusterModel`] (never serialized as part of the public API).
#[derive(Clone, Debug)]
pub struct NodeSample {
    pub descriptor: NodeDescriptor,
    pub reachable: bool,
    pub is_leader: bool,
    pub short_error: Option<String>,
    pub full_error: Option<String>,
    pub collections: Vec<CollectionReport>,
    pub disk_snapshots: Vec<SnapshotEntry>,
    pub api_snapshots: Vec<SnapshotEntry>,
    pub rtt_ms: Option<u64>,
    /// Peer id this node's own `/cluster` response names as the raft leader. `isLeader` is
    /// derived from this (`reported_leader_peer_id == Some(descriptor.peer_id)`); kept
    /// separately so the Cluster Model can compute true majority agreement across nodes
    /// rather than only counting self-claims (see `DESIGN.md`).
    pub reported_leader_peer_id: Option<String>,
}

impl NodeSample {
    /// Build the sample produced when a node could not be reached at all (spec §4.2).
    pub fn unreachable(descriptor: NodeDescriptor, short_error: String, full_error: String) -> Self {
        NodeSample {
            descriptor,
            reachable: false,
            is_leader: false,
            short_error: Some(short_error),
            full_error: Some(full_error),
            collections: Vec::new(),
            disk_snapshots: Vec::new(),
            api_snapshots: Vec::new(),
            rtt_ms: None,
            reported_leader_peer_id: None,
        }
    }
}

/// Overall cluster health classification (spec §3 invariants).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ClusterStatus {
    Healthy,
    Degraded,
    Unavailable,
}

/// Per-node summary exposed as part of the published [`ClusterModel`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeView {
    pub peer_id: String,
    pub host: String,
    pub port: u16,
    pub pod_name: Option<String>,
    pub pod_namespace: Option<String>,
    pub stateful_set_name: Option<String>,
    pub reachable: bool,
    pub is_leader: bool,
    pub short_error: Option<String>,
    pub rtt_ms: Option<u64>,
}

/// One node's slice of a [`CollectionView`], keyed by `peerId` (never `podName`, spec §4.5).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionNodeSlice {
    pub size_bytes: u64,
    pub shards: Vec<ShardId>,
    pub shard_states: BTreeMap<ShardId, ShardState>,
    pub outgoing_transfers: Vec<ShardTransfer>,
}

/// Aggregated per-collection topology (spec §3).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionView {
    pub name: String,
    pub total_size_bytes: u64,
    pub nodes: BTreeMap<String, CollectionNodeSlice>,
    pub issues: Vec<String>,
}

/// Singleton, atomically refreshed cluster-wide view (spec §3).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterModel {
    pub status: ClusterStatus,
    pub nodes: Vec<NodeView>,
    pub leader_peer_id: Option<String>,
    pub collections: Vec<CollectionView>,
    pub snapshots: Vec<SnapshotEntry>,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub last_refresh: OffsetDateTime,
}

impl ClusterModel {
    /// Number of nodes currently marked reachable.
    pub fn healthy_nodes(&self) -> usize {
        self.nodes.iter().filter(|node| node.reachable).count()
    }

    /// `healthyNodes / totalNodes * 100`, `0` when there are no nodes at all (spec §3).
    pub fn health_percentage(&self) -> f64 {
        if self.nodes.is_empty() {
            return 0.0;
        }
        (self.healthy_nodes() as f64 / self.nodes.len() as f64) * 100.0
    }
}

/// Outcome of one target of a multi-target [`OperationResult`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationTargetResult {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Result of one Operation Executor (C7) invocation (spec §3, §4.7).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub success: bool,
    pub message: String,
    pub results: BTreeMap<String, OperationTargetResult>,
}

impl OperationResult {
    /// Aggregate per-target results into one [`OperationResult`] using the `success=true` iff
    /// all targets succeed / `"X/Y targets succeeded"` summary contract of spec §4.7 (§8 S5:
    /// the message names the success count, not the failure count).
    pub fn aggregate(results: BTreeMap<String, OperationTargetResult>) -> Self {
        let total = results.len();
        let failed = results.values().filter(|result| !result.success).count();
        let succeeded = total - failed;
        let success = failed == 0;
        let message = if failed == 0 {
            format!("{succeeded}/{total} targets succeeded")
        } else {
            format!("{succeeded}/{total} targets succeeded ({failed} failed)")
        };
        OperationResult {
            success,
            message,
            results,
        }
    }
}
