//! Fold per-node [`NodeSample`]s into a fresh [`ClusterModel`] (C3, C5, C6; spec §4.3-§4.6).
//!
//! Grounded on the `ClusterViewBuilder` incremental-builder pattern (populate
//! indices while detecting duplicates), adapted from single-threaded `Rc` indices to plain
//! owned values folded in one pass, and from `HashMap` to `BTreeMap` so collections and
//! node lists come out pre-sorted (spec §4.5 "sorted lexicographically").
use std::collections::BTreeMap;

use time::OffsetDateTime;

use crate::model::ClusterModel;
use crate::model::ClusterStatus;
use crate::model::CollectionNodeSlice;
use crate::model::CollectionView;
use crate::model::NodeSample;
use crate::model::NodeView;
use crate::model::SnapshotEntry;
use crate::model::SnapshotSource;

/// Fold all samples collected during one Monitor Loop tick into a fresh [`ClusterModel`].
pub fn fold(samples: Vec<NodeSample>) -> ClusterModel {
    let (deduped, mut warnings) = dedupe_by_peer_id(samples);

    let reachable_count = deduped.values().filter(|sample| sample.reachable).count();
    let (leader_peer_id, leader_warning) = elect_leader(&deduped, reachable_count);
    warnings.extend(leader_warning);

    let mut nodes: Vec<NodeView> = deduped
        .values()
        .map(|sample| NodeView {
            peer_id: sample.descriptor.peer_id.clone(),
            host: sample.descriptor.host.clone(),
            port: sample.descriptor.port,
            pod_name: sample.descriptor.pod_name.clone(),
            pod_namespace: sample.descriptor.pod_namespace.clone(),
            stateful_set_name: sample.descriptor.stateful_set_name.clone(),
            reachable: sample.reachable,
            is_leader: sample.is_leader,
            short_error: sample.short_error.clone(),
            rtt_ms: sample.rtt_ms,
        })
        .collect();
    nodes.sort_by(|a, b| a.peer_id.cmp(&b.peer_id));

    let samples: Vec<&NodeSample> = deduped.values().collect();
    let (collections, issues) = fold_collections(&samples);
    let snapshots = fold_snapshots(&samples);

    let status = compute_status(&nodes, leader_peer_id.as_deref(), &issues);

    ClusterModel {
        status,
        nodes,
        leader_peer_id,
        collections,
        snapshots,
        issues,
        warnings,
        last_refresh: OffsetDateTime::now_utc(),
    }
}

/// Deduplicate samples by `peerId`, keeping the latest occurrence (spec §4.3 step 1).
///
/// Returns the deduplicated samples keyed by `peerId`, plus any warnings raised for peers
/// whose `(host, port)` changed between the previous and latest sample.
fn dedupe_by_peer_id(samples: Vec<NodeSample>) -> (BTreeMap<String, NodeSample>, Vec<String>) {
    let mut warnings = Vec::new();
    let mut by_peer: BTreeMap<String, NodeSample> = BTreeMap::new();
    for sample in samples {
        let peer_id = sample.descriptor.peer_id.clone();
        if let Some(previous) = by_peer.get(&peer_id) {
            let moved = previous.descriptor.host != sample.descriptor.host
                || previous.descriptor.port != sample.descriptor.port;
            if moved {
                warnings.push(format!(
                    "peer {} endpoint changed from {}:{} to {}:{}",
                    peer_id,
                    previous.descriptor.host,
                    previous.descriptor.port,
                    sample.descriptor.host,
                    sample.descriptor.port,
                ));
            }
        }
        by_peer.insert(peer_id, sample);
    }
    (by_peer, warnings)
}

/// Elect the cluster leader by majority agreement among reachable nodes (spec §4.3 step 2).
fn elect_leader(
    samples: &BTreeMap<String, NodeSample>,
    reachable_count: usize,
) -> (Option<String>, Option<String>) {
    let mut votes: BTreeMap<String, usize> = BTreeMap::new();
    for sample in samples.values().filter(|sample| sample.reachable) {
        if let Some(leader) = &sample.reported_leader_peer_id {
            *votes.entry(leader.clone()).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(&String, &usize)> = votes.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(a.1));

    match ranked.first() {
        Some((peer_id, count)) if **count * 2 > reachable_count && reachable_count > 0 => {
            // A second candidate with the same vote count means disagreement, not majority.
            let tied = ranked.get(1).map(|(_, c)| **c == **count).unwrap_or(false);
            if tied {
                (None, Some("Leader disagreement".to_string()))
            } else {
                (Some((*peer_id).clone()), None)
            }
        }
        _ if !votes.is_empty() => (None, Some("Leader disagreement".to_string())),
        _ => (None, None),
    }
}

/// Fold per-node [`CollectionReport`]s into [`CollectionView`]s (C5, spec §4.5).
fn fold_collections(samples: &[&NodeSample]) -> (Vec<CollectionView>, Vec<String>) {
    let mut names: Vec<String> = Vec::new();
    for sample in samples {
        for report in &sample.collections {
            if !names.contains(&report.name) {
                names.push(report.name.clone());
            }
        }
    }
    names.sort();

    let mut issues = Vec::new();
    let mut views = Vec::with_capacity(names.len());
    for name in names {
        let (view, mut view_issues) = fold_one_collection(&name, samples);
        issues.append(&mut view_issues);
        views.push(view);
    }
    (views, issues)
}

fn fold_one_collection(name: &str, samples: &[&NodeSample]) -> (CollectionView, Vec<String>) {
    let mut nodes: BTreeMap<String, CollectionNodeSlice> = BTreeMap::new();
    let mut issues = Vec::new();
    let mut reachable_shard_sets: Vec<(String, Vec<u32>)> = Vec::new();
    let mut reachable_with_collection = 0usize;
    let mut reachable_total = 0usize;
    let mut have_shard_sizes = false;

    for sample in samples {
        if !sample.reachable {
            continue;
        }
        reachable_total += 1;
        let report = match sample.collections.iter().find(|report| report.name == name) {
            Some(report) => report,
            None => continue,
        };
        reachable_with_collection += 1;

        for (shard_id, state) in &report.shard_states {
            if !state.is_active() {
                issues.push(format!(
                    "collection {}: shard {} is {} on peer {}",
                    name, shard_id, state, sample.descriptor.peer_id
                ));
            }
        }

        let mut shards = report.shards.clone();
        shards.sort_unstable();
        reachable_shard_sets.push((sample.descriptor.peer_id.clone(), shards));
        if !report.shard_size_bytes.is_empty() {
            have_shard_sizes = true;
        }

        nodes.insert(
            sample.descriptor.peer_id.clone(),
            CollectionNodeSlice {
                size_bytes: report.size_bytes,
                shards: report.shards.clone(),
                shard_states: report.shard_states.clone(),
                outgoing_transfers: report.outgoing_transfers.clone(),
            },
        );
    }

    // Shard set disagreement across reachable replicas.
    if let Some((_, first)) = reachable_shard_sets.first() {
        let mismatch = reachable_shard_sets
            .iter()
            .any(|(_, shards)| shards != first);
        if mismatch {
            issues.push(format!("collection {}: shard set mismatch", name));
        }
    }

    // Reachable node missing the collection while at least one other reports it.
    if reachable_with_collection > 0 && reachable_with_collection < reachable_total {
        for sample in samples {
            if !sample.reachable {
                continue;
            }
            let has_it = sample.collections.iter().any(|report| report.name == name);
            if !has_it {
                issues.push(format!(
                    "collection {}: missing on peer {}",
                    name, sample.descriptor.peer_id
                ));
            }
        }
    }

    let total_size_bytes = if have_shard_sizes {
        // Sum each distinct shardId once, regardless of how many peers replicate it (spec §9
        // Open Question, resolved in DESIGN.md decision 3).
        let mut seen: std::collections::BTreeSet<u32> = Default::default();
        let mut total = 0u64;
        for sample in samples {
            if !sample.reachable {
                continue;
            }
            if let Some(report) = sample.collections.iter().find(|report| report.name == name) {
                for (shard_id, size) in &report.shard_size_bytes {
                    if seen.insert(*shard_id) {
                        total += size;
                    }
                }
            }
        }
        total
    } else {
        nodes.values().map(|slice| slice.size_bytes).sum()
    };

    let view = CollectionView {
        name: name.to_string(),
        total_size_bytes,
        nodes,
        issues: issues.clone(),
    };
    (view, issues)
}

/// Union API-reported and on-disk snapshots across all samples (C6, spec §4.6).
pub fn fold_snapshots(samples: &[&NodeSample]) -> Vec<SnapshotEntry> {
    let mut by_key: BTreeMap<(String, String, String), SnapshotEntry> = BTreeMap::new();
    for sample in samples {
        for entry in &sample.disk_snapshots {
            let key = (
                entry.collection_name.clone(),
                entry.peer_id.clone(),
                entry.snapshot_name.clone(),
            );
            by_key.entry(key).or_insert_with(|| entry.clone());
        }
    }
    for sample in samples {
        for entry in &sample.api_snapshots {
            let key = (
                entry.collection_name.clone(),
                entry.peer_id.clone(),
                entry.snapshot_name.clone(),
            );
            // API metadata is authoritative: always overwrite a disk-only placeholder.
            let mut entry = entry.clone();
            entry.source = SnapshotSource::Api;
            by_key.insert(key, entry);
        }
    }
    by_key.into_values().collect()
}

/// Compute overall [`ClusterStatus`] per the invariants of spec §3.
fn compute_status(nodes: &[NodeView], leader_peer_id: Option<&str>, issues: &[String]) -> ClusterStatus {
    let healthy_nodes = nodes.iter().filter(|node| node.reachable).count();
    if healthy_nodes == 0 {
        return ClusterStatus::Unavailable;
    }

    let all_reachable = nodes.iter().all(|node| node.reachable);
    let has_single_leader = leader_peer_id.is_some();
    let no_shard_mismatch = !issues.iter().any(|issue| issue.contains("shard set mismatch"));

    if all_reachable && has_single_leader && no_shard_mismatch {
        ClusterStatus::Healthy
    } else {
        ClusterStatus::Degraded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CollectionReport;
    use crate::model::NodeDescriptor;
    use crate::model::ShardState;

    fn descriptor(peer_id: &str) -> NodeDescriptor {
        NodeDescriptor {
            peer_id: peer_id.to_string(),
            host: format!("{peer_id}.local"),
            port: 6333,
            scheme: "http".to_string(),
            pod_name: None,
            pod_namespace: None,
            stateful_set_name: None,
        }
    }

    fn healthy_sample(peer_id: &str, leader: &str, shards_active: bool) -> NodeSample {
        let mut shard_states = BTreeMap::new();
        for shard in 0..3u32 {
            let state = if shards_active || shard != 0 {
                ShardState::Active
            } else {
                ShardState::Dead
            };
            shard_states.insert(shard, state);
        }
        NodeSample {
            descriptor: descriptor(peer_id),
            reachable: true,
            is_leader: peer_id == leader,
            short_error: None,
            full_error: None,
            collections: vec![CollectionReport {
                name: "docs".to_string(),
                size_bytes: 100,
                shards: vec![0, 1, 2],
                shard_states,
                outgoing_transfers: Vec::new(),
                shard_size_bytes: BTreeMap::new(),
            }],
            disk_snapshots: Vec::new(),
            api_snapshots: Vec::new(),
            rtt_ms: Some(5),
            reported_leader_peer_id: Some(leader.to_string()),
        }
    }

    #[test]
    fn s1_healthy_cluster_three_nodes() {
        let samples = vec![
            healthy_sample("P1", "P1", true),
            healthy_sample("P2", "P1", true),
            healthy_sample("P3", "P1", true),
        ];
        let model = fold(samples);
        assert_eq!(model.status, ClusterStatus::Healthy);
        assert_eq!(model.healthy_nodes(), 3);
        assert_eq!(model.health_percentage(), 100.0);
        assert_eq!(model.leader_peer_id.as_deref(), Some("P1"));
        assert!(model.issues.is_empty());
    }

    #[test]
    fn s2_one_node_unreachable() {
        let mut p3 = healthy_sample("P3", "P1", true);
        p3.reachable = false;
        p3.is_leader = false;
        p3.reported_leader_peer_id = None;
        p3.collections.clear();
        p3.short_error = Some("timed out".to_string());

        let samples = vec![healthy_sample("P1", "P1", true), healthy_sample("P2", "P1", true), p3];
        let model = fold(samples);
        assert_eq!(model.status, ClusterStatus::Degraded);
        assert_eq!(model.healthy_nodes(), 2);
        assert!((model.health_percentage() - 66.666).abs() < 0.01);
    }

    #[test]
    fn s3_shard_mismatch_issue() {
        let samples = vec![
            healthy_sample("P1", "P1", true),
            healthy_sample("P2", "P1", false),
        ];
        let model = fold(samples);
        let collection = &model.collections[0];
        assert!(collection
            .issues
            .iter()
            .any(|issue| issue == "collection docs: shard 0 is Dead on peer P2"));
    }

    #[test]
    fn total_size_bytes_counts_replicated_shard_once() {
        let mut p1 = healthy_sample("P1", "P1", true);
        let mut p2 = healthy_sample("P2", "P1", true);
        for sample in [&mut p1, &mut p2] {
            let report = &mut sample.collections[0];
            report.shard_size_bytes.insert(0, 1000);
        }

        let model = fold(vec![p1, p2]);
        assert_eq!(model.collections[0].total_size_bytes, 1000);
    }

    #[test]
    fn no_reachable_nodes_is_unavailable() {
        let mut p1 = healthy_sample("P1", "P1", true);
        p1.reachable = false;
        p1.reported_leader_peer_id = None;
        let model = fold(vec![p1]);
        assert_eq!(model.status, ClusterStatus::Unavailable);
        assert_eq!(model.healthy_nodes(), 0);
    }

    #[test]
    fn invariant_4_tied_leader_votes_elect_no_leader() {
        let mut p1 = healthy_sample("P1", "P1", true);
        let mut p2 = healthy_sample("P2", "P2", true);
        p1.reported_leader_peer_id = Some("P1".to_string());
        p2.reported_leader_peer_id = Some("P2".to_string());

        let model = fold(vec![p1, p2]);
        assert_eq!(model.leader_peer_id, None);
        assert!(model.warnings.iter().any(|warning| warning.contains("Leader disagreement")));
    }

    #[test]
    fn invariant_5_distinct_peer_ids_with_shared_pod_name_both_survive() {
        let mut p1 = descriptor("P1");
        p1.pod_name = Some("qdrant-0".to_string());
        let mut p2 = descriptor("P2");
        p2.pod_name = Some("qdrant-0".to_string());

        let mut sample1 = healthy_sample("P1", "P1", true);
        sample1.descriptor = p1;
        let mut sample2 = healthy_sample("P2", "P1", true);
        sample2.descriptor = p2;

        let model = fold(vec![sample1, sample2]);
        assert_eq!(model.nodes.len(), 2);
        assert!(model.nodes.iter().any(|node| node.peer_id == "P1"));
        assert!(model.nodes.iter().any(|node| node.peer_id == "P2"));

        let collection = &model.collections[0];
        assert_eq!(collection.nodes.len(), 2);
        assert!(collection.nodes.contains_key("P1"));
        assert!(collection.nodes.contains_key("P2"));
    }

    #[test]
    fn dedupe_keeps_latest_and_warns_on_move() {
        let mut moved = descriptor("P1");
        moved.host = "new-host".to_string();
        let mut second = healthy_sample("P1", "P1", true);
        second.descriptor = moved;

        let samples = vec![healthy_sample("P1", "P1", true), second];
        let model = fold(samples);
        assert_eq!(model.nodes.len(), 1);
        assert_eq!(model.nodes[0].host, "new-host");
        assert!(model
            .warnings
            .iter()
            .any(|warning| warning.contains("endpoint changed")));
    }

    #[test]
    fn s6_snapshot_appears_in_model_after_next_refresh() {
        let mut p1 = healthy_sample("P1", "P1", true);
        p1.api_snapshots.push(SnapshotEntry {
            collection_name: "docs".to_string(),
            snapshot_name: "docs-snapshot".to_string(),
            size_bytes: 1024,
            created_at: OffsetDateTime::UNIX_EPOCH,
            source: SnapshotSource::Api,
            peer_id: "P1".to_string(),
            node_url: "http://p1.local:6333".to_string(),
            pod_name: None,
            pod_namespace: None,
            checksum: None,
        });

        let model = fold(vec![p1]);
        assert_eq!(model.snapshots.len(), 1);
        assert_eq!(model.snapshots[0].snapshot_name, "docs-snapshot");
        assert_eq!(model.snapshots[0].source, SnapshotSource::Api);
    }
}
