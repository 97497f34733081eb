//! Process initialisation builder for aspects to initialise for all commands.
use std::sync::Arc;
use std::time::Duration;

use actix_web::HttpServer;
use anyhow::Context as AnyhowContext;
use anyhow::Result;
use tokio_util::sync::CancellationToken;

use replisdk::runtime::actix_web::AppConfigurer;
use replisdk::runtime::actix_web::AppFactory;
use replisdk::runtime::actix_web::ServerConfig;
use replisdk::runtime::shutdown::ShutdownManager;
use replisdk::runtime::shutdown::ShutdownManagerBuilder;
use replisdk::runtime::telemetry;
use replisdk::runtime::telemetry::Telemetry;
use replisdk::runtime::telemetry::TelemetryConfig;
use replisdk::runtime::telemetry::TelemetryOptions;

use vigilante_clients_orchestrator::OrchestratorClients;
use vigilante_clients_node::NodeClients;
use vigilante_cluster_monitor::Monitor;
use vigilante_cluster_prober::Prober;
use vigilante_cluster_registry::NodeRegistry;
use vigilante_conf::Conf;
use vigilante_context::Context;
use vigilante_injector::Clients;
use vigilante_injector::Injector;
use vigilante_objectstore_client::ObjectStoreClient;
use vigilante_operator::Operator;
use vigilante_orchestrator_client::Client as OrchestratorClient;

/// Prefix for request metrics names.
const REQUEST_METRICS_PREFIX: &str = "vigilante";

/// Builder pattern to configure and start an ActixWeb Server.
#[derive(Clone)]
pub struct ActixServer {
    app: AppConfigurer,
    conf: ServerConfig,
    metrics: prometheus::Registry,
}

impl ActixServer {
    /// Create an ActixWeb Server configuration builder.
    pub fn new(conf: ServerConfig, metrics: prometheus::Registry) -> Self {
        ActixServer {
            app: Default::default(),
            conf,
            metrics,
        }
    }

    /// Convert the builder into an [`HttpServer`](actix_web::HttpServer) and run it.
    pub fn run(self, context: Context) -> Result<actix_web::dev::Server> {
        let context_middleware = vigilante_context::ContextMiddleware::new(context);
        let factory = AppFactory::configure(self.app, self.conf.clone())
            .metrics(REQUEST_METRICS_PREFIX, self.metrics)
            .done();
        let server = HttpServer::new(move || {
            let app = factory.initialise().wrap(context_middleware.clone());
            let app = app.configure(crate::api::configure);
            factory.finalise(app)
        });
        let server = self.conf.apply(server)?;
        Ok(server.run())
    }
}

/// Process builder to initialise all `vigilante-core` commands.
pub struct GenericInit {
    pub api: ActixServer,
    pub conf: Conf,
    pub shutdown: ShutdownManagerBuilder<()>,
    pub telemetry: Telemetry,
    pub monitor: Arc<Monitor>,
    pub cancel: CancellationToken,
    pub context: Context,
}

impl GenericInit {
    /// Build a process from the loaded configuration: telemetry, clients, the Node Registry,
    /// Node Prober, Monitor Loop and Operation Executor, wired into the global [`Injector`].
    pub async fn configure(conf: Conf) -> Result<Self> {
        let telemetry = telemetry(conf.telemetry.clone()).await?;
        let context = Context::root(telemetry.logger.clone()).build();

        let orchestrator = OrchestratorClients::factory(&conf.orchestrator)
            .await
            .context("failed to initialise the container orchestrator client")?;
        let orchestrator: Arc<OrchestratorClient> = Arc::new(orchestrator);

        let http_timeout = Duration::from_secs(conf.qdrant.http_timeout_seconds);
        let node_clients = NodeClients::new(conf.qdrant.api_key.clone(), http_timeout);
        let objectstore = conf.qdrant.s3.as_ref().map(|s3| Arc::new(ObjectStoreClient::new(s3)));

        let registry = Arc::new(NodeRegistry::new(
            &conf.qdrant,
            conf.orchestrator.clone(),
            Some(Arc::clone(&orchestrator)),
        ));
        let prober = Arc::new(Prober::new(
            node_clients.clone(),
            http_timeout,
            conf.orchestrator.clone(),
            Some(Arc::clone(&orchestrator)),
        ));
        let interval = Duration::from_secs(conf.qdrant.monitoring_interval_seconds);
        let monitor = Arc::new(Monitor::new(
            registry,
            prober,
            interval,
            http_timeout,
            conf.qdrant.max_concurrent_probes,
        ));

        let model = monitor.handle();
        let operator = Operator::new(
            node_clients.clone(),
            Arc::clone(&orchestrator),
            conf.orchestrator.clone(),
            model.clone(),
        );

        let injector = Injector {
            clients: Clients {
                node: node_clients,
                orchestrator,
                objectstore,
            },
            conf: conf.clone(),
            context: context.clone(),
            model,
            operator: Arc::new(operator),
        };
        Injector::set_global(injector);

        let api = ActixServer::new(conf.http.clone(), telemetry.metrics.clone());
        let shutdown = shutdown_manager(telemetry.logger.clone(), &conf);
        let server = Self {
            api,
            conf,
            shutdown,
            telemetry,
            monitor,
            cancel: CancellationToken::new(),
            context,
        };
        Ok(server)
    }

    /// Configure and run the API server, and spawn the Monitor Loop alongside it.
    pub fn run_server(mut self) -> Result<Self> {
        slog::debug!(self.telemetry.logger, "Starting API server");
        let server = self.api.clone().run(self.context.clone())?;
        self.shutdown = self.shutdown.watch_actix(server, ());

        let monitor = Arc::clone(&self.monitor);
        let cancel = self.cancel.clone();
        let context = self.context.clone();
        tokio::spawn(async move { monitor.run(&context, cancel).await });

        // The Monitor Loop has no actix-specific shutdown hook to attach to, so it watches
        // the same cancellation token directly; a single Ctrl-C listener cancels it in step
        // with actix's own graceful shutdown.
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });

        slog::info!(
            self.telemetry.logger, "API server listening for connection";
            "address" => &self.conf.http.bind,
        );
        Ok(self)
    }

    /// Initialisation done, wait until the process fails or the user shuts it down.
    pub async fn wait(self) -> Result<()> {
        slog::info!(
            self.telemetry.logger,
            "Vigilante process initialisation complete"
        );
        let exit = self.shutdown.build();
        let result = exit.wait().await;
        self.cancel.cancel();
        result
    }
}

/// Initialise process shutdown manager.
pub fn shutdown_manager(logger: slog::Logger, conf: &Conf) -> ShutdownManagerBuilder<()> {
    let grace = Duration::from_secs(conf.runtime.shutdown_grace_sec);
    ShutdownManager::builder()
        .logger(logger)
        .graceful_shutdown_timeout(grace)
}

/// Initialise process telemetry.
pub async fn telemetry(conf: TelemetryConfig) -> Result<Telemetry> {
    let telemetry_options = TelemetryOptions::for_sentry_release(super::RELEASE_ID)
        .for_app(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
        .finish();
    let telemetry = telemetry::initialise(conf, telemetry_options).await?;
    slog::info!(telemetry.logger, "Process telemetry initialised");
    Ok(telemetry)
}
