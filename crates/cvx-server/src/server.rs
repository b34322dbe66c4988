use std::future::Future;
use std::sync::Arc;

use cvx_ledger::{InMemoryLedger, LedgerStore};
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// Civilytix HTTP server.
///
/// Owns the storage handle for the lifetime of the process: opened in
/// [`CivilytixServer::open`], closed once the listener has drained.
pub struct CivilytixServer {
    state: AppState,
}

impl CivilytixServer {
    /// Open the configured ledger and wire the gateway over it.
    pub fn open(config: ServerConfig) -> ServerResult<Self> {
        config.validate()?;
        let store = Arc::new(InMemoryLedger::open(&config.storage)?);
        Ok(Self::with_state(AppState::new(config, store)))
    }

    pub fn with_state(state: AppState) -> Self {
        Self { state }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    pub fn store(&self) -> Arc<dyn LedgerStore> {
        Arc::clone(&self.state.store)
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Serve until Ctrl-C, then close the store.
    pub async fn serve(self) -> ServerResult<()> {
        self.serve_with_shutdown(shutdown_signal()).await
    }

    /// Serve until `signal` resolves, then close the store.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(&self.state.config.bind_addr).await?;
        let local = listener.local_addr()?;
        tracing::info!(
            addr = %local,
            production = %self.state.config.gate.production,
            "Civilytix server listening"
        );

        let app = build_router(self.state.clone());
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()));

        // Close even if serving failed so the snapshot is not lost.
        let closed = self.state.store.close().await;
        tracing::info!("Civilytix server stopped");
        served?;
        closed.map_err(ServerError::from)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
