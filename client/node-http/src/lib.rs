//! Qdrant node API client for the HTTP(S) protocol (spec §4.2, §4.7).
use anyhow::Context;
use anyhow::Result;
use reqwest::Client as ReqwestClient;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use vigilante_cluster_model::CollectionReport;
use vigilante_cluster_model::ShardId;
use vigilante_cluster_model::ShardState;
use vigilante_cluster_model::ShardTransfer;
use vigilante_node_client::ClusterInfo;
use vigilante_node_client::INode;
use vigilante_node_client::NodeOutcome;
use vigilante_node_client::SnapshotDescriptor;
use vigilante_node_client::SnapshotDownload;

pub use vigilante_client_utils::ClientOptions;

/// String to set as the user agent in HTTP requests.
static CLIENT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Node API client for the HTTP(S) protocol.
pub struct HttpClient {
    /// Base URL of the node's API server, trailing slash included.
    base: String,

    /// Optional API key sent as the `api-key` header (spec §4.2 "optional API key").
    api_key: Option<String>,

    /// Low-level [`reqwest::Client`] to perform HTTP requests with.
    client: ReqwestClient,
}

impl HttpClient {
    /// Initialise a client with [`ClientOptions`] and an optional API key.
    pub fn with<O>(options: O, api_key: Option<String>) -> Result<HttpClient>
    where
        O: Into<ClientOptions>,
    {
        let options = options.into();
        let client = options.client(CLIENT_USER_AGENT)?.build()?;
        Ok(HttpClient {
            base: options.address,
            api_key,
            client,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let request = self.client.request(method, format!("{}{}", self.base, path));
        match &self.api_key {
            None => request,
            Some(key) => request.header("api-key", key),
        }
    }

    async fn get<T>(&self, path: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self.request(reqwest::Method::GET, path).send().await?;
        decode(response).await
    }

    async fn send_for_outcome(&self, request: reqwest::RequestBuilder) -> Result<NodeOutcome> {
        let response = request.send().await?;
        decode::<serde_json::Value>(response).await?;
        Ok(NodeOutcome::accepted())
    }
}

#[async_trait::async_trait]
impl INode for HttpClient {
    async fn cluster_info(&self) -> Result<ClusterInfo> {
        let info: ClusterResponse = self.get("cluster").await?;
        Ok(ClusterInfo {
            peer_id: info.peer_id.to_string(),
            leader_peer_id: info.raft_info.leader.map(|id| id.to_string()),
        })
    }

    async fn collections(&self) -> Result<Vec<CollectionReport>> {
        let list: CollectionsResponse = self.get("collections").await?;
        let mut reports = Vec::with_capacity(list.collections.len());
        for summary in list.collections {
            let path = format!("collections/{}/cluster", summary.name);
            let info: CollectionClusterResponse = self.get(&path).await?;
            reports.push(info.into_report(summary.name));
        }
        Ok(reports)
    }

    async fn collection_snapshots(&self, collection: &str) -> Result<Vec<SnapshotDescriptor>> {
        let path = format!("collections/{}/snapshots", collection);
        let response = self.request(reqwest::Method::GET, &path).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let list: SnapshotsResponse = decode(response).await?;
        Ok(list.into_iter().map(SnapshotDescriptor::from).collect())
    }

    async fn collection_exists(&self, collection: &str) -> Result<bool> {
        let path = format!("collections/{}", collection);
        let response = self.request(reqwest::Method::GET, &path).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        let _: serde_json::Value = decode(response).await?;
        Ok(true)
    }

    async fn delete_collection(&self, collection: &str) -> Result<NodeOutcome> {
        let path = format!("collections/{}", collection);
        let response = self.request(reqwest::Method::DELETE, &path).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(NodeOutcome::accepted());
        }
        decode::<serde_json::Value>(response).await?;
        Ok(NodeOutcome::accepted())
    }

    async fn replicate_shard(
        &self,
        collection: &str,
        shard_id: u32,
        target_peer_id: &str,
        is_move: bool,
    ) -> Result<NodeOutcome> {
        let path = format!("collections/{}/cluster", collection);
        let target: u64 = target_peer_id
            .parse()
            .with_context(|| format!("peer id '{}' is not numeric", target_peer_id))?;
        let body = if is_move {
            serde_json::json!({"move_shard": {"shard_id": shard_id, "to_peer_id": target}})
        } else {
            serde_json::json!({"replicate_shard": {"shard_id": shard_id, "to_peer_id": target}})
        };
        let request = self.request(reqwest::Method::POST, &path).json(&body);
        self.send_for_outcome(request).await
    }

    async fn create_snapshot(&self, collection: &str) -> Result<NodeOutcome> {
        let path = format!("collections/{}/snapshots", collection);
        let request = self.request(reqwest::Method::POST, &path);
        self.send_for_outcome(request).await
    }

    async fn recover_snapshot(&self, collection: &str, snapshot_name: &str) -> Result<NodeOutcome> {
        let path = format!("collections/{}/snapshots/{}/recover", collection, snapshot_name);
        let request = self.request(reqwest::Method::PUT, &path);
        self.send_for_outcome(request).await
    }

    async fn recover_snapshot_from_url(
        &self,
        collection: &str,
        snapshot_url: &str,
        checksum: Option<String>,
    ) -> Result<NodeOutcome> {
        let path = format!("collections/{}/snapshots/recover", collection);
        let body = RecoverFromUrl {
            location: snapshot_url.to_string(),
            checksum,
        };
        let request = self.request(reqwest::Method::PUT, &path).json(&body);
        self.send_for_outcome(request).await
    }

    async fn download_snapshot(
        &self,
        collection: &str,
        snapshot_name: &str,
    ) -> Result<SnapshotDownload> {
        let path = format!("collections/{}/snapshots/{}", collection, snapshot_name);
        let response = self.request(reqwest::Method::GET, &path).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            anyhow::bail!(vigilante_client_utils::ResourceNotFound);
        }
        if !response.status().is_success() {
            anyhow::bail!(vigilante_client_utils::ServerError);
        }
        let content_length = response.content_length();
        let bytes = response.bytes_stream();
        let bytes = futures_util::StreamExt::map(bytes, |chunk| chunk.map_err(anyhow::Error::from));
        Ok(SnapshotDownload {
            content_length,
            bytes: Box::pin(bytes),
        })
    }

    async fn delete_snapshot(&self, collection: &str, snapshot_name: &str) -> Result<NodeOutcome> {
        let path = format!("collections/{}/snapshots/{}", collection, snapshot_name);
        let response = self.request(reqwest::Method::DELETE, &path).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(NodeOutcome::accepted());
        }
        decode::<serde_json::Value>(response).await?;
        Ok(NodeOutcome::accepted())
    }
}

/// Decode a node API envelope (`{"status": ..., "result": ...}`), classifying HTTP and
/// payload-level errors per spec §4.2's "2xx with `status=\"accepted\"` counts as success" rule.
async fn decode<T>(response: reqwest::Response) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let code = response.status();
    let text = response.text().await?;
    if code == StatusCode::NOT_FOUND {
        anyhow::bail!(vigilante_client_utils::ResourceNotFound);
    }
    let envelope: Envelope<T> = serde_json::from_str(&text).map_err(|error| {
        let response = text.clone();
        anyhow::anyhow!(error).context(vigilante_client_utils::InvalidResponse { response })
    })?;
    match envelope.status {
        Status::Error { error } if code.is_client_error() => {
            Err(anyhow::anyhow!(error).context(vigilante_client_utils::ClientError))
        }
        Status::Error { error } => {
            Err(anyhow::anyhow!(error).context(vigilante_client_utils::ServerError))
        }
        Status::Ok(_) => envelope
            .result
            .ok_or_else(|| anyhow::anyhow!(vigilante_client_utils::EmptyResponse)),
    }
}

/// Generic node API response envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: Status,
    #[serde(default)]
    result: Option<T>,
}

/// Node API status field: either a simple string (`"ok"`, `"accepted"`) or an error object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Status {
    Ok(String),
    Error { error: String },
}

#[derive(Debug, Deserialize)]
struct ClusterResponse {
    peer_id: u64,
    raft_info: RaftInfo,
}

#[derive(Debug, Deserialize)]
struct RaftInfo {
    #[serde(default)]
    leader: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct CollectionsResponse {
    collections: Vec<CollectionSummary>,
}

#[derive(Debug, Deserialize)]
struct CollectionSummary {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CollectionClusterResponse {
    #[serde(default)]
    local_shards: Vec<LocalShard>,
    #[serde(default)]
    shard_transfers: Vec<ShardTransferWire>,
}

impl CollectionClusterResponse {
    fn into_report(self, name: String) -> CollectionReport {
        let mut shards = Vec::with_capacity(self.local_shards.len());
        let mut shard_states = std::collections::BTreeMap::new();
        let mut shard_size_bytes = std::collections::BTreeMap::new();
        let mut size_bytes = 0u64;
        for shard in self.local_shards {
            shards.push(shard.shard_id);
            shard_states.insert(shard.shard_id, shard.state.into());
            shard_size_bytes.insert(shard.shard_id, shard.points_count.unwrap_or(0));
            size_bytes += shard.points_count.unwrap_or(0);
        }
        let outgoing_transfers = self
            .shard_transfers
            .into_iter()
            .map(|transfer| ShardTransfer {
                shard_id: transfer.shard_id,
                to: transfer.to.to_string(),
                is_sync: transfer.sync,
            })
            .collect();
        CollectionReport {
            name,
            size_bytes,
            shards,
            shard_states,
            outgoing_transfers,
            shard_size_bytes,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LocalShard {
    shard_id: ShardId,
    state: WireShardState,
    #[serde(default)]
    points_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ShardTransferWire {
    shard_id: ShardId,
    to: u64,
    #[serde(default)]
    sync: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
enum WireShardState {
    Active,
    Initializing,
    Dead,
    Listener,
    PartialSnapshot,
    Partial,
    Resharding,
}

impl From<WireShardState> for ShardState {
    fn from(value: WireShardState) -> Self {
        match value {
            WireShardState::Active => ShardState::Active,
            WireShardState::Initializing => ShardState::Initializing,
            WireShardState::Dead => ShardState::Dead,
            WireShardState::Listener => ShardState::Listener,
            WireShardState::PartialSnapshot => ShardState::PartialSnapshot,
            WireShardState::Partial => ShardState::Partial,
            WireShardState::Resharding => ShardState::Resharding,
        }
    }
}

type SnapshotsResponse = Vec<SnapshotWire>;

#[derive(Debug, Deserialize)]
struct SnapshotWire {
    name: String,
    size: u64,
    creation_time: String,
    #[serde(default)]
    checksum: Option<String>,
}

impl From<SnapshotWire> for SnapshotDescriptor {
    fn from(value: SnapshotWire) -> Self {
        let created_at = OffsetDateTime::parse(
            &value.creation_time,
            &time::format_description::well_known::Rfc3339,
        )
        .unwrap_or(OffsetDateTime::UNIX_EPOCH);
        SnapshotDescriptor {
            name: value.name,
            size_bytes: value.size,
            created_at,
            checksum: value.checksum,
        }
    }
}

#[derive(Debug, Serialize)]
struct RecoverFromUrl {
    location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    checksum: Option<String>,
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::method;
    use wiremock::matchers::path;
    use wiremock::Mock;
    use wiremock::MockServer;
    use wiremock::ResponseTemplate;

    use super::*;

    async fn client_for(server: &MockServer) -> HttpClient {
        HttpClient::with(ClientOptions::url(server.uri()), None).unwrap()
    }

    #[tokio::test]
    async fn invariant_2_delete_missing_collection_is_idempotent_success() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/collections/docs"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let outcome = client.delete_collection("docs").await.unwrap();
        assert!(outcome.accepted);
    }

    #[tokio::test]
    async fn delete_collection_honors_server_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/collections/docs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": {"error": "collection is locked"},
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let error = client.delete_collection("docs").await.unwrap_err();
        assert!(error.to_string().contains("collection is locked"));
    }

    #[tokio::test]
    async fn create_snapshot_accepts_a_real_ok_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/docs/snapshots"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "ok",
                "result": true,
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let outcome = client.create_snapshot("docs").await.unwrap();
        assert!(outcome.accepted);
    }

    #[tokio::test]
    async fn delete_collection_accepts_a_real_ok_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/collections/docs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "ok",
                "result": true,
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let outcome = client.delete_collection("docs").await.unwrap();
        assert!(outcome.accepted);
    }

    #[tokio::test]
    async fn invariant_6_download_snapshot_is_byte_exact() {
        let payload = b"qdrant-snapshot-bytes-0123456789".to_vec();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/docs/snapshots/docs-snapshot"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(payload.clone()))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let download = client.download_snapshot("docs", "docs-snapshot").await.unwrap();
        assert_eq!(download.content_length, Some(payload.len() as u64));

        let mut received = Vec::new();
        let mut stream = download.bytes;
        while let Some(chunk) = futures_util::StreamExt::next(&mut stream).await {
            received.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(received, payload);
    }
}
