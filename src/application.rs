//! Application wiring: store owner, ingestion pipeline and HTTP server.

use crate::core::{Config, ExporterError, Result};
use crate::export::Exporter;
use crate::monitoring::IngestMonitor;
use crate::receiver::http::{create_http_router, HttpState};
use crate::receiver::rewrite::LabelRewriter;
use crate::receiver::Ingestor;
use crate::store::SampleStore;
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Main application struct that coordinates all components of the exporter.
pub struct Application {
    /// Sample store handle
    store: SampleStore,
    /// Store owner task
    store_task: JoinHandle<()>,
    /// Ingestion health monitor
    monitor: Arc<IngestMonitor>,
    /// Router serving ingestion, scrape and health endpoints
    router: Router,
    /// Application configuration
    config: Config,
}

impl Application {
    /// Create a new Application with the given configuration.
    ///
    /// Spawns the store owner task, so this must run inside a tokio runtime.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let monitor = Arc::new(IngestMonitor::new());
        let (store, store_task) = SampleStore::spawn(&config.store);

        let rewriter = LabelRewriter::new(&config.labels.replace);
        if !rewriter.is_empty() {
            tracing::info!(renames = rewriter.len(), "Label renames configured");
        }

        let state = HttpState {
            ingestor: Arc::new(Ingestor::new(store.clone(), rewriter, Arc::clone(&monitor))),
            exporter: Arc::new(Exporter::new(store.clone(), Arc::clone(&monitor))),
            max_body_bytes: config.server.max_body_bytes,
            max_decoded_bytes: config.server.max_decoded_bytes,
        };
        let router = create_http_router(state, &config.server.put_path);

        Ok(Self {
            store,
            store_task,
            monitor,
            router,
            config,
        })
    }

    /// Bind the configured address and serve until ctrl-c.
    pub async fn run(self) -> Result<()> {
        let addr = self.config.server.listen_address;
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            ExporterError::network(format!("Failed to bind HTTP server to {}: {}", addr, e))
        })?;

        self.serve(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Received shutdown signal, stopping...");
        })
        .await
    }

    /// Serve on an already bound listener until `shutdown` resolves, then
    /// stop the store owner.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = listener.local_addr()?;
        tracing::info!(
            put_path = %self.config.server.put_path,
            "Serving on {}",
            local_addr
        );

        let served = axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ExporterError::network(format!("HTTP server error: {}", e)));

        if let Err(e) = self.store.shutdown().await {
            tracing::warn!("Sample store already stopped: {}", e);
        }
        self.store_task.await?;
        tracing::info!("Shutdown complete");

        served
    }

    /// Get a reference to the sample store.
    pub fn store(&self) -> &SampleStore {
        &self.store
    }

    /// Get a reference to the ingestion monitor.
    pub fn monitor(&self) -> &Arc<IngestMonitor> {
        &self.monitor
    }

    /// Router serving every endpoint, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get the application configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}
