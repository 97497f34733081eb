//! Data object storing Vigilante's configuration.
use serde::Deserialize;
use serde::Serialize;

use replisdk::runtime::actix_web::ServerConfig;
use replisdk::runtime::telemetry::TelemetryConfig;

use super::RuntimeConf;

/// Global configuration for the Vigilante process.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Conf {
    /// HTTP Server configuration.
    #[serde(default)]
    pub http: ServerConfig,

    /// Node Registry and Operation Executor orchestrator configuration.
    #[serde(default)]
    pub orchestrator: OrchestratorConf,

    /// Qdrant cluster configuration.
    #[serde(default)]
    pub qdrant: QdrantConf,

    /// Process runtime configuration.
    #[serde(default)]
    pub runtime: RuntimeConf,

    /// Telemetry configuration for the process.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Qdrant cluster and monitoring configuration (spec §6).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QdrantConf {
    /// Interval, in seconds, between Monitor Loop ticks.
    #[serde(default = "QdrantConf::default_monitoring_interval_seconds")]
    pub monitoring_interval_seconds: u64,

    /// Per-HTTP-call timeout, in seconds, used by the Node Prober.
    #[serde(default = "QdrantConf::default_http_timeout_seconds")]
    pub http_timeout_seconds: u64,

    /// Reserved: enable automatic recovery actions. Not implemented by the Operation
    /// Executor (spec Non-goals excludes automatic shard placement); kept so operators can
    /// set it without a config validation failure.
    #[serde(default = "QdrantConf::default_enable_auto_recovery")]
    pub enable_auto_recovery: bool,

    /// API key sent with every request to a Qdrant node, if configured.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Static seed list of Qdrant nodes. Used when `orchestrator.mode = "Static"`.
    #[serde(default)]
    pub nodes: Vec<QdrantNodeConf>,

    /// Upper bound on concurrent probes per Monitor Loop tick. Defaults to the node count.
    #[serde(default)]
    pub max_concurrent_probes: Option<usize>,

    /// Object store (S3-compatible) configuration for snapshot presigning.
    #[serde(default)]
    pub s3: Option<S3Conf>,
}

impl QdrantConf {
    fn default_monitoring_interval_seconds() -> u64 {
        30
    }

    fn default_http_timeout_seconds() -> u64 {
        5
    }

    fn default_enable_auto_recovery() -> bool {
        true
    }
}

impl Default for QdrantConf {
    fn default() -> Self {
        QdrantConf {
            monitoring_interval_seconds: Self::default_monitoring_interval_seconds(),
            http_timeout_seconds: Self::default_http_timeout_seconds(),
            enable_auto_recovery: Self::default_enable_auto_recovery(),
            api_key: None,
            nodes: Vec::new(),
            max_concurrent_probes: None,
            s3: None,
        }
    }
}

/// A single statically configured Qdrant node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QdrantNodeConf {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub pod_name: Option<String>,
}

/// S3-compatible object store configuration for snapshot URL presigning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct S3Conf {
    pub endpoint_url: String,
    pub access_key: String,
    pub secret_key: String,
    #[serde(default = "S3Conf::default_region")]
    pub region: String,
}

impl S3Conf {
    fn default_region() -> String {
        "default".into()
    }
}

/// How the Node Registry (C1) obtains the current list of nodes.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum RegistryMode {
    /// Use the static seed list from `Qdrant.Nodes`.
    #[default]
    Static,
    /// Query the orchestrator for pods matching a label selector in a namespace.
    Discovered,
}

/// Orchestrator client and Node Registry discovery configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrchestratorConf {
    /// Node Registry mode: static seed list or orchestrator discovery.
    #[serde(default)]
    pub mode: RegistryMode,

    /// Namespace to discover pods in. Required when `mode = "Discovered"`.
    #[serde(default)]
    pub namespace: Option<String>,

    /// Label selector identifying Qdrant pods. Required when `mode = "Discovered"`.
    #[serde(default)]
    pub label_selector: Option<String>,

    /// Container port Qdrant listens on within discovered pods.
    #[serde(default = "OrchestratorConf::default_container_port")]
    pub container_port: u16,

    /// Root path of the collection/snapshot storage tree on pod disks.
    #[serde(default = "OrchestratorConf::default_storage_root")]
    pub storage_root: String,

    /// Per-exec-operation timeout, in seconds (`T_exec`, default 30s).
    #[serde(default = "OrchestratorConf::default_exec_timeout_seconds")]
    pub exec_timeout_seconds: u64,

    /// Upper bound, in seconds, spent polling for `waitForResult` snapshot recovery
    /// (`T_recovery_max`, default 5 minutes).
    #[serde(default = "OrchestratorConf::default_recovery_max_seconds")]
    pub recovery_max_seconds: u64,
}

impl OrchestratorConf {
    fn default_container_port() -> u16 {
        6333
    }

    fn default_storage_root() -> String {
        "/qdrant/storage/collections".into()
    }

    fn default_exec_timeout_seconds() -> u64 {
        30
    }

    fn default_recovery_max_seconds() -> u64 {
        5 * 60
    }
}

impl Default for OrchestratorConf {
    fn default() -> Self {
        OrchestratorConf {
            mode: RegistryMode::default(),
            namespace: None,
            label_selector: None,
            container_port: Self::default_container_port(),
            storage_root: Self::default_storage_root(),
            exec_timeout_seconds: Self::default_exec_timeout_seconds(),
            recovery_max_seconds: Self::default_recovery_max_seconds(),
        }
    }
}
