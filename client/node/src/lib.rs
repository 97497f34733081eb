//! Async client library to interact with Qdrant node HTTP APIs (spec §4.2, §4.7).
use anyhow::Result;
use time::OffsetDateTime;

use vigilante_cluster_model::CollectionReport;

mod error;

#[cfg(any(test, feature = "test-fixture"))]
pub mod fixture;

pub use self::error::CollectionNotFound;

/// Byte stream returned by [`INode::download_snapshot`]; a boxed [`futures_util::Stream`] so
/// the HTTP and disk-exec backends can share one trait signature (spec §4.7 "Download Snapshot").
pub type ByteStream =
    std::pin::Pin<Box<dyn futures_util::Stream<Item = Result<bytes::Bytes>> + Send>>;

/// Result of the node's `/cluster` endpoint: this node's own peer id and the peer it
/// currently believes is raft leader (spec §3 `NodeSample.reportedLeaderPeerId`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterInfo {
    pub peer_id: String,
    pub leader_peer_id: Option<String>,
}

/// Outcome of a node call that is classified success/failure per spec §4.2's "2xx with
/// `status=\"accepted\"` counts as success" rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeOutcome {
    pub accepted: bool,
}

impl NodeOutcome {
    pub fn accepted() -> Self {
        NodeOutcome { accepted: true }
    }
}

/// One snapshot as reported by a node's API, before the Snapshot Aggregator (C6) attaches
/// `peerId`/`nodeUrl`/`podName` context (spec §3 `SnapshotEntry`).
#[derive(Clone, Debug, PartialEq)]
pub struct SnapshotDescriptor {
    pub name: String,
    pub size_bytes: u64,
    pub created_at: OffsetDateTime,
    pub checksum: Option<String>,
}

/// A downloaded snapshot's bytes plus the original `Content-Length`, preserved byte-exact
/// end to end (spec §4.7 "Download Snapshot").
pub struct SnapshotDownload {
    pub content_length: Option<u64>,
    pub bytes: ByteStream,
}

/// Async API client to a single Qdrant node.
pub struct Client {
    backend: Box<dyn INode>,
}

impl Client {
    /// Query the node's `/cluster` endpoint for peers and leader (spec §4.2 step 1).
    pub async fn cluster_info(&self) -> Result<ClusterInfo> {
        self.backend.cluster_info().await
    }

    /// Query the node's `/collections` endpoint for per-collection cluster/shard state
    /// (spec §4.2 step 2).
    pub async fn collections(&self) -> Result<Vec<CollectionReport>> {
        self.backend.collections().await
    }

    /// Query `/collections/{c}/snapshots` for API-reported snapshots (spec §4.2 step 3).
    pub async fn collection_snapshots(&self, collection: &str) -> Result<Vec<SnapshotDescriptor>> {
        self.backend.collection_snapshots(collection).await
    }

    /// Whether a collection currently exists, used by the `waitForResult` recovery poll
    /// (spec §4.7 "Recover From Snapshot").
    pub async fn collection_exists(&self, collection: &str) -> Result<bool> {
        self.backend.collection_exists(collection).await
    }

    /// Delete a collection via the database API (spec §4.7 "Delete Collection", `Api` mode).
    pub async fn delete_collection(&self, collection: &str) -> Result<NodeOutcome> {
        self.backend.delete_collection(collection).await
    }

    /// Request replication or move of a shard to another peer (spec §4.7 "Replicate / Move
    /// Shards").
    pub async fn replicate_shard(
        &self,
        collection: &str,
        shard_id: u32,
        target_peer_id: &str,
        is_move: bool,
    ) -> Result<NodeOutcome> {
        self.backend
            .replicate_shard(collection, shard_id, target_peer_id, is_move)
            .await
    }

    /// Ask the node to create a snapshot of a collection (spec §4.7 "Create Snapshot").
    pub async fn create_snapshot(&self, collection: &str) -> Result<NodeOutcome> {
        self.backend.create_snapshot(collection).await
    }

    /// Ask the node to recover a collection from a snapshot already on that node (spec §4.7
    /// "Recover From Snapshot", by-name form).
    pub async fn recover_snapshot(&self, collection: &str, snapshot_name: &str) -> Result<NodeOutcome> {
        self.backend.recover_snapshot(collection, snapshot_name).await
    }

    /// Ask the node to recover a collection from a snapshot fetched from a URL (spec §4.7
    /// "Recover From Snapshot", by-URL form).
    pub async fn recover_snapshot_from_url(
        &self,
        collection: &str,
        snapshot_url: &str,
        checksum: Option<String>,
    ) -> Result<NodeOutcome> {
        self.backend
            .recover_snapshot_from_url(collection, snapshot_url, checksum)
            .await
    }

    /// Stream a snapshot's bytes from the node (spec §4.7 "Download Snapshot", API path).
    pub async fn download_snapshot(
        &self,
        collection: &str,
        snapshot_name: &str,
    ) -> Result<SnapshotDownload> {
        self.backend.download_snapshot(collection, snapshot_name).await
    }

    /// Delete a snapshot via the database API (spec §4.7 "Delete Snapshot").
    pub async fn delete_snapshot(&self, collection: &str, snapshot_name: &str) -> Result<NodeOutcome> {
        self.backend.delete_snapshot(collection, snapshot_name).await
    }
}

impl<P> From<P> for Client
where
    P: INode + 'static,
{
    fn from(value: P) -> Self {
        let backend = Box::new(value);
        Client { backend }
    }
}

/// Interface to Qdrant node API clients.
///
/// Enables implementation of node API clients across different transport protocols
/// (spec §9 "capability interfaces at module boundaries").
#[async_trait::async_trait]
pub trait INode: Send + Sync {
    async fn cluster_info(&self) -> Result<ClusterInfo>;
    async fn collections(&self) -> Result<Vec<CollectionReport>>;
    async fn collection_snapshots(&self, collection: &str) -> Result<Vec<SnapshotDescriptor>>;
    async fn collection_exists(&self, collection: &str) -> Result<bool>;
    async fn delete_collection(&self, collection: &str) -> Result<NodeOutcome>;
    async fn replicate_shard(
        &self,
        collection: &str,
        shard_id: u32,
        target_peer_id: &str,
        is_move: bool,
    ) -> Result<NodeOutcome>;
    async fn create_snapshot(&self, collection: &str) -> Result<NodeOutcome>;
    async fn recover_snapshot(&self, collection: &str, snapshot_name: &str) -> Result<NodeOutcome>;
    async fn recover_snapshot_from_url(
        &self,
        collection: &str,
        snapshot_url: &str,
        checksum: Option<String>,
    ) -> Result<NodeOutcome>;
    async fn download_snapshot(
        &self,
        collection: &str,
        snapshot_name: &str,
    ) -> Result<SnapshotDownload>;
    async fn delete_snapshot(&self, collection: &str, snapshot_name: &str) -> Result<NodeOutcome>;
}
