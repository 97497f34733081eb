//! In-memory fake node implementation for unit and scenario tests.
use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::Result;
use time::OffsetDateTime;

use vigilante_cluster_model::CollectionReport;

use crate::ClusterInfo;
use crate::NodeOutcome;
use crate::SnapshotDescriptor;
use crate::SnapshotDownload;

/// In-memory fake implementation of [`crate::INode`] for tests.
pub struct Client {
    state: Mutex<ClientState>,
}

impl Client {
    /// Initialise a new fake node with the given peer id.
    pub fn new(peer_id: &str) -> Client {
        let state = ClientState {
            peer_id: peer_id.into(),
            leader_peer_id: None,
            unreachable: false,
            collections: BTreeMap::new(),
            snapshots: BTreeMap::new(),
            deleted_collections: Default::default(),
        };
        Client {
            state: Mutex::new(state),
        }
    }

    /// Set which peer this node reports as raft leader.
    pub fn leader(&self, leader_peer_id: &str) -> &Self {
        let mut state = self.state.lock().unwrap();
        state.leader_peer_id = Some(leader_peer_id.into());
        self
    }

    /// Make the node behave as unreachable for every call.
    pub fn unreachable(&self) -> &Self {
        let mut state = self.state.lock().unwrap();
        state.unreachable = true;
        self
    }

    /// Add a collection report to the node.
    pub fn collection(&self, report: CollectionReport) -> &Self {
        let mut state = self.state.lock().unwrap();
        state.collections.insert(report.name.clone(), report);
        self
    }

    /// Add a snapshot to a collection.
    pub fn snapshot(&self, collection: &str, snapshot: SnapshotDescriptor) -> &Self {
        let mut state = self.state.lock().unwrap();
        state
            .snapshots
            .entry(collection.into())
            .or_default()
            .push(snapshot);
        self
    }

    fn check_reachable(&self) -> Result<()> {
        let state = self.state.lock().unwrap();
        if state.unreachable {
            anyhow::bail!("fixture node marked unreachable");
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl super::INode for Client {
    async fn cluster_info(&self) -> Result<ClusterInfo> {
        self.check_reachable()?;
        let state = self.state.lock().unwrap();
        Ok(ClusterInfo {
            peer_id: state.peer_id.clone(),
            leader_peer_id: state.leader_peer_id.clone(),
        })
    }

    async fn collections(&self) -> Result<Vec<CollectionReport>> {
        self.check_reachable()?;
        let state = self.state.lock().unwrap();
        Ok(state.collections.values().cloned().collect())
    }

    async fn collection_snapshots(&self, collection: &str) -> Result<Vec<SnapshotDescriptor>> {
        self.check_reachable()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .snapshots
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    async fn collection_exists(&self, collection: &str) -> Result<bool> {
        self.check_reachable()?;
        let state = self.state.lock().unwrap();
        Ok(state.collections.contains_key(collection))
    }

    async fn delete_collection(&self, collection: &str) -> Result<NodeOutcome> {
        self.check_reachable()?;
        let mut state = self.state.lock().unwrap();
        state.collections.remove(collection);
        state.deleted_collections.push(collection.into());
        Ok(NodeOutcome::accepted())
    }

    async fn replicate_shard(
        &self,
        _collection: &str,
        _shard_id: u32,
        _target_peer_id: &str,
        _is_move: bool,
    ) -> Result<NodeOutcome> {
        self.check_reachable()?;
        Ok(NodeOutcome::accepted())
    }

    async fn create_snapshot(&self, collection: &str) -> Result<NodeOutcome> {
        self.check_reachable()?;
        let mut state = self.state.lock().unwrap();
        let name = format!("{}-snapshot", collection);
        state
            .snapshots
            .entry(collection.into())
            .or_default()
            .push(SnapshotDescriptor {
                name,
                size_bytes: 0,
                created_at: OffsetDateTime::UNIX_EPOCH,
                checksum: None,
            });
        Ok(NodeOutcome::accepted())
    }

    async fn recover_snapshot(&self, _collection: &str, _snapshot_name: &str) -> Result<NodeOutcome> {
        self.check_reachable()?;
        Ok(NodeOutcome::accepted())
    }

    async fn recover_snapshot_from_url(
        &self,
        _collection: &str,
        _snapshot_url: &str,
        _checksum: Option<String>,
    ) -> Result<NodeOutcome> {
        self.check_reachable()?;
        Ok(NodeOutcome::accepted())
    }

    async fn download_snapshot(
        &self,
        collection: &str,
        snapshot_name: &str,
    ) -> Result<SnapshotDownload> {
        self.check_reachable()?;
        let _ = (collection, snapshot_name);
        let bytes = bytes::Bytes::from_static(b"fixture-snapshot-bytes");
        let len = bytes.len() as u64;
        let stream = futures_util::stream::once(async move { Ok(bytes) });
        Ok(SnapshotDownload {
            content_length: Some(len),
            bytes: Box::pin(stream),
        })
    }

    async fn delete_snapshot(&self, collection: &str, snapshot_name: &str) -> Result<NodeOutcome> {
        self.check_reachable()?;
        let mut state = self.state.lock().unwrap();
        if let Some(snapshots) = state.snapshots.get_mut(collection) {
            snapshots.retain(|s| s.name != snapshot_name);
        }
        Ok(NodeOutcome::accepted())
    }
}

/// Internal state backing the fake node.
struct ClientState {
    peer_id: String,
    leader_peer_id: Option<String>,
    unreachable: bool,
    collections: BTreeMap<String, CollectionReport>,
    snapshots: BTreeMap<String, Vec<SnapshotDescriptor>>,
    deleted_collections: Vec<String>,
}
