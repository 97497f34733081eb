//! Dependency injection to enable easy access to Process Global resources.
use std::sync::Arc;
use std::sync::RwLock;

use once_cell::sync::Lazy;

use vigilante_cluster_monitor::ModelHandle;
use vigilante_conf::Conf;
use vigilante_context::Context;
use vigilante_operator::Operator;

mod clients;

pub use self::clients::Clients;

/// Singleton instance of the Process Globals container.
static GLOBAL_INJECTOR: Lazy<RwLock<Option<Injector>>> = Lazy::new(|| RwLock::new(None));

/// Container for all process global dependencies to be injected in other components.
#[derive(Clone)]
pub struct Injector {
    /// API client handles for the orchestrator, Qdrant nodes and object store.
    pub clients: Clients,

    /// Process global configuration.
    pub conf: Conf,

    /// Process global context to derive scoped contexts from.
    pub context: Context,

    /// Handle to the latest published `ClusterModel` (spec §4.3, §4.4).
    pub model: ModelHandle,

    /// Operation Executor: single entry point per Qdrant/orchestrator operation kind.
    pub operator: Arc<Operator>,
}

impl Injector {
    /// Get the globally set [`Injector`] instance.
    ///
    /// # Panics
    ///
    /// Panics if no [`Injector`] was set during process initialisation.
    pub fn global() -> Injector {
        GLOBAL_INJECTOR
            .read()
            .expect("GLOBAL_INJECTOR RwLock poisoned")
            .as_ref()
            .expect("global injector is not initialised")
            .clone()
    }

    /// Set the [`Injector`] instance for the process to fetch with [`Injector::global`].
    ///
    /// # Panics
    ///
    /// Panics if an [`Injector`] has already been set.
    pub fn set_global(injector: Injector) {
        // Obtain a lock to initialise the global injector.
        let mut global_injector = GLOBAL_INJECTOR
            .write()
            .expect("GLOBAL_INJECTOR RwLock poisoned");

        // If the global injector is already initialised panic (without poisoning the lock).
        if global_injector.is_some() {
            drop(global_injector);
            panic!("global injector already initialised");
        }

        // Set the global injector for the process.
        slog::trace!(
            injector.context.logger,
            "Initialising Global Injector for the process"
        );
        *global_injector = Some(injector);
    }
}

#[cfg(any(test, feature = "test-fixture"))]
impl Injector {
    /// [`Injector`] instance to be used with unit tests.
    pub fn fixture() -> Injector {
        use std::time::Duration;

        let orchestrator = vigilante_orchestrator_client::fixture::Client::default();
        let orchestrator = Arc::new(vigilante_orchestrator_client::Client::from(orchestrator));
        let node = vigilante_clients_node::NodeClients::new(None, Duration::from_secs(5));

        let registry = Arc::new(vigilante_cluster_registry::NodeRegistry::new(
            &vigilante_conf::QdrantConf::default(),
            vigilante_conf::OrchestratorConf::default(),
            Some(Arc::clone(&orchestrator)),
        ));
        let prober = Arc::new(vigilante_cluster_prober::Prober::new(
            node.clone(),
            Duration::from_secs(5),
            vigilante_conf::OrchestratorConf::default(),
            Some(Arc::clone(&orchestrator)),
        ));
        let monitor = vigilante_cluster_monitor::Monitor::new(
            registry,
            prober,
            Duration::from_secs(30),
            Duration::from_secs(5),
            None,
        );
        let model = monitor.handle();
        let operator = Arc::new(Operator::new(
            node.clone(),
            Arc::clone(&orchestrator),
            vigilante_conf::OrchestratorConf::default(),
            model.clone(),
        ));

        Injector {
            clients: Clients {
                node,
                orchestrator,
                objectstore: None,
            },
            conf: Conf::default(),
            context: Context::fixture(),
            model,
            operator,
        }
    }
}
