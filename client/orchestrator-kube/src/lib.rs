//! Kubernetes implementation of the orchestrator client (spec §6 "Orchestrator interface").
use anyhow::Context;
use anyhow::Result;
use futures_util::AsyncReadExt;
use futures_util::StreamExt;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::Pod;
use kube::api::AttachParams;
use kube::api::DeleteParams;
use kube::api::ListParams;
use kube::api::Patch;
use kube::api::PatchParams;
use kube::Api;

use vigilante_conf::OrchestratorConf;
use vigilante_orchestrator_client::ExecOutput;
use vigilante_orchestrator_client::IOrchestrator;
use vigilante_orchestrator_client::PodInfo;
use vigilante_orchestrator_client::PodPhase;
use vigilante_orchestrator_client::StatefulSetPatch;

/// Kubernetes orchestrator client.
pub struct KubeClient {
    client: kube::Client,
}

impl KubeClient {
    /// Connect to the Kubernetes API using the in-cluster or kubeconfig-derived configuration.
    pub async fn connect(_conf: &OrchestratorConf) -> Result<KubeClient> {
        let client = kube::Client::try_default()
            .await
            .context("failed to build Kubernetes client")?;
        Ok(KubeClient { client })
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn stateful_sets(&self, namespace: &str) -> Api<StatefulSet> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait::async_trait]
impl IOrchestrator for KubeClient {
    async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<PodInfo>> {
        let params = ListParams::default().labels(label_selector);
        let list = self.pods(namespace).list(&params).await?;
        Ok(list.items.iter().map(pod_info).collect())
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<PodInfo> {
        let pod = self.pods(namespace).get(name).await?;
        Ok(pod_info(&pod))
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<()> {
        // No grace-period override (spec §4.7 "Pod Delete"): the stateful-set controller
        // recreates the pod once Kubernetes finishes the default termination.
        self.pods(namespace)
            .delete(name, &DeleteParams::default())
            .await?;
        Ok(())
    }

    async fn exec(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        argv: Vec<String>,
    ) -> Result<ExecOutput> {
        let params = AttachParams::default()
            .container(container)
            .stdout(true)
            .stderr(true);
        let mut attached = self
            .pods(namespace)
            .exec(pod, argv, &params)
            .await
            .context("failed to start exec session")?;

        let mut stdout = Vec::new();
        if let Some(mut stream) = attached.stdout() {
            stream.read_to_end(&mut stdout).await.ok();
        }
        let mut stderr = Vec::new();
        if let Some(mut stream) = attached.stderr() {
            stream.read_to_end(&mut stderr).await.ok();
        }

        let exit_code = match attached.take_status() {
            Some(mut status) => match status.next().await {
                Some(status) if status.status.as_deref() == Some("Success") => 0,
                Some(_) => 1,
                None => 0,
            },
            None => 0,
        };
        attached.join().await.ok();
        Ok(ExecOutput {
            stdout,
            stderr,
            exit_code,
        })
    }

    async fn patch_stateful_set(
        &self,
        namespace: &str,
        name: &str,
        patch: StatefulSetPatch,
    ) -> Result<()> {
        let body = match patch {
            StatefulSetPatch::Rollout { restarted_at } => serde_json::json!({
                "spec": {
                    "template": {
                        "metadata": {
                            "annotations": {
                                "vigilante.aer.io/restartedAt": restarted_at
                            }
                        }
                    }
                }
            }),
            StatefulSetPatch::Scale { replicas } => serde_json::json!({
                "spec": { "replicas": replicas }
            }),
        };
        let params = PatchParams::apply("vigilante");
        self.stateful_sets(namespace)
            .patch(name, &params, &Patch::Merge(body))
            .await?;
        Ok(())
    }
}

/// Map a Kubernetes [`Pod`] into the orchestrator-agnostic [`PodInfo`] (spec §4.1).
fn pod_info(pod: &Pod) -> PodInfo {
    let name = pod
        .metadata
        .name
        .clone()
        .unwrap_or_else(|| "unknown".into());
    let namespace = pod
        .metadata
        .namespace
        .clone()
        .unwrap_or_else(|| "default".into());
    let ip = pod
        .status
        .as_ref()
        .and_then(|status| status.pod_ip.clone());
    let phase = pod
        .status
        .as_ref()
        .and_then(|status| status.phase.as_deref())
        .map(|phase| match phase {
            "Pending" => PodPhase::Pending,
            "Running" => PodPhase::Running,
            "Succeeded" => PodPhase::Succeeded,
            "Failed" => PodPhase::Failed,
            _ => PodPhase::Unknown,
        })
        .unwrap_or(PodPhase::Unknown);
    let owner_stateful_set = pod
        .metadata
        .owner_references
        .as_ref()
        .and_then(|owners| owners.iter().find(|owner| owner.kind == "StatefulSet"))
        .map(|owner| owner.name.clone());
    PodInfo {
        name,
        namespace,
        ip,
        phase,
        owner_stateful_set,
    }
}
