//! Monitor Loop (C4, spec §4.4): the single long-running task that drives every tick.
//!
//! Tick structure (load → sync → fold → report each cycle) and cooperative-shutdown idiom
//! grounded on `core-logic/task/orchestrate/src/callback.rs` and
//! `bin/replicore/src/init/generic.rs` (`ShutdownManager`), adapted from
//! `replisdk::runtime::shutdown` (not in this retrieval pack's dependency surface) to
//! `tokio-util::sync::CancellationToken`, the general-purpose equivalent.
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use arc_swap::ArcSwap;
use tokio_util::sync::CancellationToken;

use vigilante_cluster_model::fold;
use vigilante_cluster_model::ClusterModel;
use vigilante_cluster_model::NodeSample;
use vigilante_cluster_prober::Prober;
use vigilante_cluster_registry::NodeRegistry;
use vigilante_context::Context;

/// Shared, atomically-swapped handle to the latest [`ClusterModel`] (spec §4.3 "writes are
/// atomic ... pointer/handle swap").
#[derive(Clone)]
pub struct ModelHandle(Arc<ArcSwap<ClusterModel>>);

impl ModelHandle {
    fn new(model: ClusterModel) -> Self {
        ModelHandle(Arc::new(ArcSwap::from_pointee(model)))
    }

    /// The most recently published [`ClusterModel`].
    pub fn load(&self) -> Arc<ClusterModel> {
        self.0.load_full()
    }

    fn publish(&self, model: ClusterModel) {
        self.0.store(Arc::new(model));
    }
}

/// Drives one Monitor Loop tick, fanning out the Node Prober across the Node Registry's
/// current node list and folding the results into a freshly published [`ClusterModel`].
pub struct Monitor {
    registry: Arc<NodeRegistry>,
    prober: Arc<Prober>,
    interval: Duration,
    tick_deadline: Duration,
    max_concurrent_probes: Option<usize>,
    handle: ModelHandle,
}

impl Monitor {
    pub fn new(
        registry: Arc<NodeRegistry>,
        prober: Arc<Prober>,
        interval: Duration,
        http_timeout: Duration,
        max_concurrent_probes: Option<usize>,
    ) -> Self {
        Monitor {
            registry,
            prober,
            interval,
            // `T_tick = T_http * 2` (spec §4.4 step 3).
            tick_deadline: http_timeout * 2,
            max_concurrent_probes,
            handle: ModelHandle::new(empty_model()),
        }
    }

    /// Handle to read the currently published [`ClusterModel`] from any task.
    pub fn handle(&self) -> ModelHandle {
        self.handle.clone()
    }

    /// Run the Monitor Loop until `cancel` fires. Never overlaps ticks: if a tick runs longer
    /// than `interval`, the next tick starts immediately (spec §4.4 step 5).
    pub async fn run(&self, context: &Context, cancel: CancellationToken) {
        loop {
            let tick_started = Instant::now();
            tokio::select! {
                _ = cancel.cancelled() => {
                    slog::info!(context.logger, "Monitor Loop cancelled, exiting");
                    return;
                }
                () = self.tick(context) => {}
            }

            let elapsed = tick_started.elapsed();
            let sleep_for = self.interval.saturating_sub(elapsed);
            if sleep_for.is_zero() {
                slog::warn!(
                    context.logger, "Monitor Loop tick exceeded its interval, starting next tick immediately";
                    "elapsed_ms" => elapsed.as_millis() as u64, "interval_ms" => self.interval.as_millis() as u64,
                );
                continue;
            }
            tokio::select! {
                _ = cancel.cancelled() => {
                    slog::info!(context.logger, "Monitor Loop cancelled, exiting");
                    return;
                }
                _ = tokio::time::sleep(sleep_for) => {}
            }
        }
    }

    async fn tick(&self, context: &Context) {
        let descriptors = self.registry.refresh(context).await;
        let permits = self.max_concurrent_probes.unwrap_or(descriptors.len().max(1));
        let semaphore = Arc::new(tokio::sync::Semaphore::new(permits));

        // Samples are pushed here as each probe completes, independent of the overall tick
        // deadline below, so a straggling node can't discard the results of nodes that
        // answered in time.
        let collected: Arc<std::sync::Mutex<Vec<NodeSample>>> = Arc::new(std::sync::Mutex::new(Vec::new()));

        let mut tasks = tokio::task::JoinSet::new();
        for descriptor in descriptors.clone() {
            let semaphore = Arc::clone(&semaphore);
            let prober = Arc::clone(&self.prober);
            let context = context.clone();
            let collected = Arc::clone(&collected);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                let sample = prober.probe(&context, &descriptor).await;
                collected.lock().expect("collected samples mutex poisoned").push(sample);
            });
        }

        let fan_out = async {
            while let Some(result) = tasks.join_next().await {
                if let Err(error) = result {
                    slog::error!(context.logger, "Node Prober task panicked"; "error" => %error);
                }
            }
        };

        with_deadline(self.tick_deadline, fan_out, || {
            slog::warn!(
                context.logger,
                "Monitor Loop tick exceeded its deadline, remaining probes coerced to unreachable";
            );
        })
        .await;

        let mut samples = std::mem::take(&mut *collected.lock().expect("collected samples mutex poisoned"));
        let probed: std::collections::BTreeSet<String> =
            samples.iter().map(|sample| sample.descriptor.peer_id.clone()).collect();
        for descriptor in descriptors {
            if !probed.contains(&descriptor.peer_id) {
                let peer_id = descriptor.peer_id.clone();
                samples.push(NodeSample::unreachable(
                    descriptor,
                    "tick deadline exceeded".to_string(),
                    format!("peer {peer_id} did not respond before the tick deadline"),
                ));
            }
        }

        let model = fold(samples);
        slog::debug!(
            context.logger, "Published new cluster model";
            "status" => ?model.status, "nodes" => model.nodes.len(),
        );
        self.handle.publish(model);
    }
}

/// Await `fut` up to `deadline`, calling `on_timeout` if it didn't finish in time. Any progress
/// `fut` made before being dropped on timeout must be recorded through side effects visible to
/// the caller (e.g. a shared collector), since this only returns whether it finished.
async fn with_deadline<F, O>(deadline: Duration, fut: F, on_timeout: O)
where
    F: Future<Output = ()>,
    O: FnOnce(),
{
    if tokio::time::timeout(deadline, fut).await.is_err() {
        on_timeout();
    }
}

fn empty_model() -> ClusterModel {
    ClusterModel {
        status: vigilante_cluster_model::ClusterStatus::Unavailable,
        nodes: Vec::new(),
        leader_peer_id: None,
        collections: Vec::new(),
        snapshots: Vec::new(),
        issues: Vec::new(),
        warnings: vec!["cluster model not yet populated".to_string()],
        last_refresh: time::OffsetDateTime::UNIX_EPOCH,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_handle_publishes_and_loads() {
        let handle = ModelHandle::new(empty_model());
        let loaded = handle.load();
        assert_eq!(loaded.nodes.len(), 0);

        let mut replacement = empty_model();
        replacement.warnings.clear();
        handle.publish(replacement);
        let loaded = handle.load();
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn invariant_1_last_refresh_is_non_decreasing_across_reads() {
        let mut first = empty_model();
        first.last_refresh = time::OffsetDateTime::UNIX_EPOCH;
        let handle = ModelHandle::new(first);
        let read_a = handle.load();

        let mut second = empty_model();
        second.last_refresh = time::OffsetDateTime::UNIX_EPOCH + std::time::Duration::from_secs(30);
        handle.publish(second);
        let read_b = handle.load();

        assert!(read_b.last_refresh >= read_a.last_refresh);
    }

    #[tokio::test]
    async fn with_deadline_keeps_progress_made_before_timeout() {
        let collected: Arc<std::sync::Mutex<Vec<u32>>> = Arc::new(std::sync::Mutex::new(Vec::new()));
        let collected_in_task = Arc::clone(&collected);
        let fut = async move {
            collected_in_task.lock().expect("mutex poisoned").push(1);
            tokio::time::sleep(Duration::from_millis(50)).await;
            collected_in_task.lock().expect("mutex poisoned").push(2);
        };

        let mut timed_out = false;
        with_deadline(Duration::from_millis(5), fut, || timed_out = true).await;

        assert!(timed_out);
        // The straggling half of `fut` never ran, but the progress made before the deadline
        // (pushing `1`) must survive: the whole future's output is discarded on timeout, but
        // side effects recorded through a shared collector are not.
        assert_eq!(*collected.lock().expect("mutex poisoned"), vec![1]);
    }
}
