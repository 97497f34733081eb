//! Node Prober (C2, spec §4.2): per-node bounded, concurrent fetch with timeout and
//! classification.
//!
//! Grounded on the `sync_node` pattern (`core-logic/task/orchestrate/src/sync/
//! node.rs`): each node is probed in isolation and a failure at any step degrades to an
//! "unreachable" record rather than propagating upward. Rather than persisting a row per
//! node, the Prober returns a [`NodeSample`] for the Monitor Loop to fold.
use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;

use vigilante_cluster_model::CollectionReport;
use vigilante_cluster_model::NodeDescriptor;
use vigilante_cluster_model::NodeSample;
use vigilante_cluster_model::SnapshotEntry;
use vigilante_cluster_model::SnapshotSource;
use vigilante_clients_node::NodeClients;
use vigilante_conf::OrchestratorConf;
use vigilante_context::Context;
use vigilante_orchestrator_client::Client as OrchestratorClient;
use vigilante_orchestrator_client::PodPhase;

/// Maximum length of [`NodeSample::short_error`], first line only (spec §4.2).
const SHORT_ERROR_MAX_LEN: usize = 120;

/// Probes individual Qdrant nodes over HTTP, classifying failures per spec §4.2 rather than
/// letting them propagate.
pub struct Prober {
    node_clients: NodeClients,
    http_timeout: Duration,
    orchestrator_conf: OrchestratorConf,
    orchestrator: Option<Arc<OrchestratorClient>>,
}

impl Prober {
    pub fn new(
        node_clients: NodeClients,
        http_timeout: Duration,
        orchestrator_conf: OrchestratorConf,
        orchestrator: Option<Arc<OrchestratorClient>>,
    ) -> Self {
        Prober {
            node_clients,
            http_timeout,
            orchestrator_conf,
            orchestrator,
        }
    }

    /// Probe one node. Never returns an error: any failure is folded into an unreachable
    /// [`NodeSample`] (spec §4.2 "never fails").
    pub async fn probe(&self, context: &Context, descriptor: &NodeDescriptor) -> NodeSample {
        let client = match self.node_clients.client(descriptor) {
            Ok(client) => client,
            Err(error) => return self.unreachable(descriptor.clone(), error),
        };

        let started = std::time::Instant::now();
        let cluster_info = match tokio::time::timeout(self.http_timeout, client.cluster_info()).await {
            Ok(Ok(info)) => info,
            Ok(Err(error)) => return self.unreachable(descriptor.clone(), error),
            Err(_) => return self.unreachable(descriptor.clone(), anyhow::anyhow!("cluster_info timed out")),
        };
        let rtt_ms = started.elapsed().as_millis() as u64;

        // The registry only knows a provisional `host:port` peer id; `/cluster` carries the
        // raft-assigned id that is authoritative cluster-wide (see DESIGN.md, decision 4).
        let mut descriptor = descriptor.clone();
        descriptor.peer_id = cluster_info.peer_id.clone();

        let collections = match tokio::time::timeout(self.http_timeout, client.collections()).await {
            Ok(Ok(collections)) => collections,
            Ok(Err(error)) => {
                slog::warn!(
                    context.logger, "Node reachable but /collections failed";
                    "peer_id" => &descriptor.peer_id, "error" => %error,
                );
                Vec::new()
            }
            Err(_) => {
                slog::warn!(
                    context.logger, "Node reachable but /collections timed out";
                    "peer_id" => &descriptor.peer_id,
                );
                Vec::new()
            }
        };

        let api_snapshots = self.probe_snapshots(context, &descriptor, &client, &collections).await;
        let disk_snapshots = self.list_disk_snapshots(context, &descriptor, &collections).await;

        let is_leader = cluster_info.leader_peer_id.as_deref() == Some(descriptor.peer_id.as_str());
        NodeSample {
            descriptor,
            reachable: true,
            is_leader,
            short_error: None,
            full_error: None,
            collections,
            disk_snapshots,
            api_snapshots,
            rtt_ms: Some(rtt_ms),
            reported_leader_peer_id: cluster_info.leader_peer_id,
        }
    }

    async fn probe_snapshots(
        &self,
        context: &Context,
        descriptor: &NodeDescriptor,
        client: &vigilante_node_client::Client,
        collections: &[CollectionReport],
    ) -> Vec<SnapshotEntry> {
        let mut entries = Vec::new();
        for collection in collections {
            let fetch = tokio::time::timeout(
                self.http_timeout,
                client.collection_snapshots(&collection.name),
            )
            .await;
            let descriptors = match fetch {
                Ok(Ok(descriptors)) => descriptors,
                Ok(Err(error)) => {
                    slog::warn!(
                        context.logger, "Listing snapshots failed for collection";
                        "peer_id" => &descriptor.peer_id, "collection" => &collection.name, "error" => %error,
                    );
                    continue;
                }
                Err(_) => {
                    slog::warn!(
                        context.logger, "Listing snapshots timed out for collection";
                        "peer_id" => &descriptor.peer_id, "collection" => &collection.name,
                    );
                    continue;
                }
            };
            for snapshot in descriptors {
                entries.push(SnapshotEntry {
                    collection_name: collection.name.clone(),
                    snapshot_name: snapshot.name,
                    size_bytes: snapshot.size_bytes,
                    created_at: snapshot.created_at,
                    source: SnapshotSource::Api,
                    peer_id: descriptor.peer_id.clone(),
                    node_url: descriptor.node_url(),
                    pod_name: descriptor.pod_name.clone(),
                    pod_namespace: descriptor.pod_namespace.clone(),
                    checksum: snapshot.checksum,
                });
            }
        }
        entries
    }

    /// List on-disk snapshot files via exec, for the Snapshot Aggregator's Disk-only rows
    /// (spec §4.6). Not part of the three calls named in spec §4.2, but `NodeSample` has
    /// nowhere else to source `diskSnapshots` from; failures here never affect `reachable`
    /// (see DESIGN.md).
    async fn list_disk_snapshots(
        &self,
        context: &Context,
        descriptor: &NodeDescriptor,
        collections: &[CollectionReport],
    ) -> Vec<SnapshotEntry> {
        let orchestrator = match &self.orchestrator {
            Some(orchestrator) => orchestrator,
            None => return Vec::new(),
        };
        let (pod_name, pod_namespace) = match (&descriptor.pod_name, &descriptor.pod_namespace) {
            (Some(name), Some(namespace)) => (name, namespace),
            _ => return Vec::new(),
        };

        let mut entries = Vec::new();
        for collection in collections {
            let dir = format!(
                "{}/{}/snapshots",
                self.orchestrator_conf.storage_root, collection.name
            );
            let argv = vec![
                "find".to_string(),
                dir,
                "-maxdepth".to_string(),
                "1".to_string(),
                "-type".to_string(),
                "f".to_string(),
                "-printf".to_string(),
                "%f|%s|%T@\\n".to_string(),
            ];
            let exec = tokio::time::timeout(
                Duration::from_secs(self.orchestrator_conf.exec_timeout_seconds),
                orchestrator.exec(pod_namespace, pod_name, "qdrant", argv),
            )
            .await;
            let output = match exec {
                Ok(Ok(output)) if output.success() => output,
                Ok(Ok(_)) | Ok(Err(_)) | Err(_) => {
                    slog::debug!(
                        context.logger, "Disk snapshot listing unavailable";
                        "peer_id" => &descriptor.peer_id, "collection" => &collection.name,
                    );
                    continue;
                }
            };
            let stdout = String::from_utf8_lossy(&output.stdout);
            for line in stdout.lines() {
                if let Some(entry) = parse_find_line(line, &collection.name, descriptor) {
                    entries.push(entry);
                }
            }
        }
        entries
    }

    fn unreachable(&self, descriptor: NodeDescriptor, error: anyhow::Error) -> NodeSample {
        let full_error = format!("{error:#}");
        let first_line = full_error.lines().next().unwrap_or(&full_error);
        let short_error: String = first_line.chars().take(SHORT_ERROR_MAX_LEN).collect();
        NodeSample::unreachable(descriptor, short_error, full_error)
    }
}

fn parse_find_line(line: &str, collection_name: &str, descriptor: &NodeDescriptor) -> Option<SnapshotEntry> {
    let mut parts = line.splitn(3, '|');
    let name = parts.next()?.to_string();
    let size_bytes: u64 = parts.next()?.parse().ok()?;
    let mtime: f64 = parts.next()?.parse().ok()?;
    let created_at = OffsetDateTime::from_unix_timestamp(mtime as i64).ok()?;
    Some(SnapshotEntry {
        collection_name: collection_name.to_string(),
        snapshot_name: name,
        size_bytes,
        created_at,
        source: SnapshotSource::Disk,
        peer_id: descriptor.peer_id.clone(),
        node_url: descriptor.node_url(),
        pod_name: descriptor.pod_name.clone(),
        pod_namespace: descriptor.pod_namespace.clone(),
        checksum: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> NodeDescriptor {
        NodeDescriptor {
            peer_id: "10.0.0.1:6333".into(),
            host: "10.0.0.1".into(),
            port: 6333,
            scheme: "http".into(),
            pod_name: None,
            pod_namespace: None,
            stateful_set_name: None,
        }
    }

    fn prober() -> Prober {
        Prober::new(
            NodeClients::new(None, Duration::from_millis(200)),
            Duration::from_millis(200),
            OrchestratorConf::default(),
            None,
        )
    }

    #[tokio::test]
    async fn unreachable_node_never_errors() {
        let prober = prober();
        let context = Context::fixture();
        // No real server listens here: cluster_info() will fail to connect, never panic or
        // propagate an Err out of `probe`.
        let sample = prober.probe(&context, &descriptor()).await;
        assert!(!sample.reachable);
        assert!(sample.short_error.is_some());
        assert!(sample.short_error.unwrap().len() <= SHORT_ERROR_MAX_LEN);
        assert!(sample.full_error.is_some());
        assert!(sample.collections.is_empty());
    }

    #[test]
    fn parse_find_line_builds_disk_entry() {
        let entry = parse_find_line("snap-1.snapshot|1024|1700000000.5", "docs", &descriptor()).unwrap();
        assert_eq!(entry.snapshot_name, "snap-1.snapshot");
        assert_eq!(entry.size_bytes, 1024);
        assert_eq!(entry.source, SnapshotSource::Disk);
    }

    #[test]
    fn parse_find_line_rejects_malformed() {
        assert!(parse_find_line("not-enough-fields", "docs", &descriptor()).is_none());
    }
}
