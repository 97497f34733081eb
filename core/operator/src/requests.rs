//! Request types for each Operation Executor entry point (spec §4.7, §6).
use serde::de::Error as _;
use serde::de::Unexpected;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;

/// `{collectionName, mode ∈ {Api, Disk}}` dispatch tag, accepted as either its numeric or
/// string wire form (spec §6 "Requests accept both numeric and string forms").
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub enum DeletionType {
    Api,
    Disk,
}

impl<'de> Deserialize<'de> for DeletionType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Wire::deserialize(deserializer)? {
            Wire::Str(value) => match value.as_str() {
                "Api" | "api" => Ok(DeletionType::Api),
                "Disk" | "disk" => Ok(DeletionType::Disk),
                other => Err(D::Error::invalid_value(Unexpected::Str(other), &"\"Api\" or \"Disk\"")),
            },
            Wire::Num(0) => Ok(DeletionType::Api),
            Wire::Num(1) => Ok(DeletionType::Disk),
            Wire::Num(other) => Err(D::Error::invalid_value(Unexpected::Unsigned(other), &"0 or 1")),
        }
    }
}

/// `op ∈ {Rollout, Scale}` (spec §6 `StatefulSetOperationType ∈ {0=Rollout,1=Scale}`).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub enum StatefulSetOperation {
    Rollout,
    Scale,
}

impl<'de> Deserialize<'de> for StatefulSetOperation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Wire::deserialize(deserializer)? {
            Wire::Str(value) => match value.as_str() {
                "Rollout" | "rollout" => Ok(StatefulSetOperation::Rollout),
                "Scale" | "scale" => Ok(StatefulSetOperation::Scale),
                other => Err(D::Error::invalid_value(Unexpected::Str(other), &"\"Rollout\" or \"Scale\"")),
            },
            Wire::Num(0) => Ok(StatefulSetOperation::Rollout),
            Wire::Num(1) => Ok(StatefulSetOperation::Scale),
            Wire::Num(other) => Err(D::Error::invalid_value(Unexpected::Unsigned(other), &"0 or 1")),
        }
    }
}

/// `scope ∈ {Cluster, SingleNode}` (spec §4.7, string only: no numeric form is specified for
/// this enum).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Scope {
    Cluster,
    SingleNode,
}

/// Helper enum so one `Deserialize` impl accepts either JSON string or JSON number wire
/// values (spec §6).
#[derive(Deserialize)]
#[serde(untagged)]
enum Wire {
    Str(String),
    Num(u64),
}

/// Identifies a pod for disk-mode operations (spec §4.7 `podRef`).
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodRef {
    pub pod_name: String,
    #[serde(default)]
    pub namespace: Option<String>,
}

/// Spec §4.7 "Replicate / Move Shards".
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicateShardsRequest {
    pub source_peer_id: String,
    pub target_peer_id: String,
    pub collection_name: String,
    pub shard_ids: Vec<u32>,
    #[serde(default)]
    pub is_move: bool,
}

/// Spec §4.7 "Delete Collection".
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCollectionRequest {
    pub collection_name: String,
    pub mode: DeletionType,
    pub scope: Scope,
    #[serde(default)]
    pub node_url: Option<String>,
    #[serde(default)]
    pub pod_ref: Option<PodRef>,
}

/// Spec §4.7 "Create Snapshot".
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSnapshotRequest {
    pub collection_name: String,
    pub scope: Scope,
    #[serde(default)]
    pub node_url: Option<String>,
}

/// Spec §4.7 "Recover From Snapshot": by-name or by-URL form, optionally blocking.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoverFromSnapshotRequest {
    pub node_url: String,
    pub collection_name: String,
    #[serde(default)]
    pub snapshot_name: Option<String>,
    #[serde(default)]
    pub snapshot_url: Option<String>,
    #[serde(default)]
    pub checksum: Option<String>,
    #[serde(default)]
    pub wait_for_result: bool,
}

/// Spec §4.7 "Download Snapshot". `podRef` enables the disk fallback when the API path
/// fails.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadSnapshotRequest {
    pub node_url: String,
    pub collection_name: String,
    pub snapshot_name: String,
    #[serde(default)]
    pub pod_ref: Option<PodRef>,
}

/// Spec §4.7 "Delete Snapshot".
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSnapshotRequest {
    pub collection_name: String,
    pub snapshot_name: String,
    pub source: DeletionType,
    #[serde(default)]
    pub node_url: Option<String>,
    #[serde(default)]
    pub pod_ref: Option<PodRef>,
}

/// Spec §4.7 "Pod Delete".
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodDeleteRequest {
    pub pod_name: String,
    #[serde(default)]
    pub namespace: Option<String>,
}

/// Spec §4.7 "Manage Stateful-Set".
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManageStatefulSetRequest {
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
    pub op: StatefulSetOperation,
    #[serde(default)]
    pub replicas: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deletion_type_accepts_string_and_numeric_forms() {
        assert_eq!(
            serde_json::from_str::<DeletionType>("\"Api\"").unwrap(),
            DeletionType::Api
        );
        assert_eq!(serde_json::from_str::<DeletionType>("1").unwrap(), DeletionType::Disk);
    }

    #[test]
    fn stateful_set_operation_accepts_string_and_numeric_forms() {
        assert_eq!(
            serde_json::from_str::<StatefulSetOperation>("\"Scale\"").unwrap(),
            StatefulSetOperation::Scale
        );
        assert_eq!(
            serde_json::from_str::<StatefulSetOperation>("0").unwrap(),
            StatefulSetOperation::Rollout
        );
    }
}
