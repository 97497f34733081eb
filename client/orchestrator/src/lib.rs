//! Async client library to interact with the container orchestrator (spec §6).
use anyhow::Result;

#[cfg(any(test, feature = "test-fixture"))]
pub mod fixture;

/// Phase of a pod as reported by the orchestrator.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

/// Minimal pod record needed by the Node Registry (C1) and Operation Executor (C7).
#[derive(Clone, Debug)]
pub struct PodInfo {
    pub name: String,
    pub namespace: String,
    pub ip: Option<String>,
    pub phase: PodPhase,
    /// Owner `StatefulSet` name, resolved via owner-reference lookup (spec §4.1).
    pub owner_stateful_set: Option<String>,
}

/// Output of an exec call against a pod container.
///
/// Exec output is buffered rather than streamed: every caller (disk-mode delete, disk-mode
/// snapshot download/delete) only needs the final bytes, never a live stream, so there is
/// nothing to gain by modelling partial reads (spec §9 "abstract ExecStream capability").
#[derive(Clone, Debug, Default)]
pub struct ExecOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i32,
}

impl ExecOutput {
    /// Whether the command exited successfully.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// A patch to apply to a `StatefulSet` (spec §4.7 "Manage Stateful-Set").
#[derive(Clone, Debug)]
pub enum StatefulSetPatch {
    /// Set the `vigilante.aer.io/restartedAt` annotation on the pod template, triggering a
    /// rolling restart.
    Rollout { restarted_at: String },
    /// Patch `.spec.replicas`.
    Scale { replicas: i32 },
}

/// Async API client to the container orchestrator.
pub struct Client {
    backend: Box<dyn IOrchestrator>,
}

impl Client {
    /// List pods matching a label selector within a namespace.
    pub async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<PodInfo>> {
        self.backend.list_pods(namespace, label_selector).await
    }

    /// Fetch a single pod by name.
    pub async fn get_pod(&self, namespace: &str, name: &str) -> Result<PodInfo> {
        self.backend.get_pod(namespace, name).await
    }

    /// Delete a pod, no grace-period override (spec §4.7 "Pod Delete").
    pub async fn delete_pod(&self, namespace: &str, name: &str) -> Result<()> {
        self.backend.delete_pod(namespace, name).await
    }

    /// Execute a command inside a pod container and collect its output.
    pub async fn exec(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        argv: Vec<String>,
    ) -> Result<ExecOutput> {
        self.backend.exec(namespace, pod, container, argv).await
    }

    /// Apply a patch to a `StatefulSet` (spec §4.7 "Manage Stateful-Set").
    pub async fn patch_stateful_set(
        &self,
        namespace: &str,
        name: &str,
        patch: StatefulSetPatch,
    ) -> Result<()> {
        self.backend.patch_stateful_set(namespace, name, patch).await
    }
}

impl<P> From<P> for Client
where
    P: IOrchestrator + 'static,
{
    fn from(value: P) -> Self {
        let backend = Box::new(value);
        Client { backend }
    }
}

/// Interface to container-orchestrator clients.
///
/// Enables implementation across different orchestrators so tests substitute in-memory fakes
/// (spec §9 "capability interfaces at module boundaries").
#[async_trait::async_trait]
pub trait IOrchestrator: Send + Sync {
    async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<PodInfo>>;
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<PodInfo>;
    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<()>;
    async fn exec(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        argv: Vec<String>,
    ) -> Result<ExecOutput>;
    async fn patch_stateful_set(
        &self,
        namespace: &str,
        name: &str,
        patch: StatefulSetPatch,
    ) -> Result<()>;
}
