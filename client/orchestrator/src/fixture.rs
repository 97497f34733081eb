//! In-memory fake orchestrator implementation for unit tests.
use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;

use crate::ExecOutput;
use crate::PodInfo;
use crate::PodPhase;
use crate::StatefulSetPatch;

/// In-memory fake implementation of [`crate::IOrchestrator`] for tests.
#[derive(Default)]
pub struct Client {
    state: Mutex<ClientState>,
}

impl Client {
    /// Add a pod to the fake cluster.
    pub fn pod(&self, pod: PodInfo) -> &Self {
        let mut state = self.state.lock().unwrap();
        state.pods.insert((pod.namespace.clone(), pod.name.clone()), pod);
        self
    }

    /// Queue the output the next `exec` call for a pod should return.
    pub fn exec_result<S1, S2>(&self, namespace: S1, pod: S2, output: ExecOutput) -> &Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        let mut state = self.state.lock().unwrap();
        state
            .exec_results
            .insert((namespace.into(), pod.into()), output);
        self
    }

    /// Number of replicas last recorded by a `Scale` patch, if any.
    pub fn replicas(&self, namespace: &str, name: &str) -> Option<i32> {
        let state = self.state.lock().unwrap();
        state
            .stateful_sets
            .get(&(namespace.to_string(), name.to_string()))
            .copied()
    }
}

#[async_trait::async_trait]
impl super::IOrchestrator for Client {
    async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<PodInfo>> {
        let _ = label_selector;
        let state = self.state.lock().unwrap();
        Ok(state
            .pods
            .values()
            .filter(|pod| pod.namespace == namespace)
            .cloned()
            .collect())
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<PodInfo> {
        let state = self.state.lock().unwrap();
        state
            .pods
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("pod '{}/{}' not found", namespace, name))
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.pods.remove(&(namespace.to_string(), name.to_string()));
        Ok(())
    }

    async fn exec(
        &self,
        namespace: &str,
        pod: &str,
        _container: &str,
        _argv: Vec<String>,
    ) -> Result<ExecOutput> {
        let state = self.state.lock().unwrap();
        Ok(state
            .exec_results
            .get(&(namespace.to_string(), pod.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn patch_stateful_set(
        &self,
        namespace: &str,
        name: &str,
        patch: StatefulSetPatch,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let StatefulSetPatch::Scale { replicas } = patch {
            state
                .stateful_sets
                .insert((namespace.to_string(), name.to_string()), replicas);
        }
        Ok(())
    }
}

impl Default for PodInfo {
    fn default() -> Self {
        PodInfo {
            name: String::new(),
            namespace: String::new(),
            ip: None,
            phase: PodPhase::Running,
            owner_stateful_set: None,
        }
    }
}

/// Internal state to implement orchestrator mocking.
#[derive(Default)]
struct ClientState {
    pods: HashMap<(String, String), PodInfo>,
    exec_results: HashMap<(String, String), ExecOutput>,
    stateful_sets: HashMap<(String, String), i32>,
}
