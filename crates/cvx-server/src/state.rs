use std::sync::Arc;
use std::time::Instant;

use cvx_gate::{ArtifactProducer, DeferredProducer, ExtractionGateway};
use cvx_ledger::LedgerStore;

use crate::auth::{AuthProvider, HeaderAuth};
use crate::config::ServerConfig;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub gateway: Arc<ExtractionGateway>,
    pub store: Arc<dyn LedgerStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub started_at: Instant,
}

impl AppState {
    /// Wire a gateway over `store` using [`HeaderAuth`] and [`DeferredProducer`].
    pub fn new<S>(config: ServerConfig, store: Arc<S>) -> Self
    where
        S: LedgerStore + 'static,
    {
        Self::with_producer(config, store, Arc::new(DeferredProducer))
    }

    pub fn with_producer<S>(
        config: ServerConfig,
        store: Arc<S>,
        producer: Arc<dyn ArtifactProducer>,
    ) -> Self
    where
        S: LedgerStore + 'static,
    {
        let gateway =
            ExtractionGateway::new(config.gate.clone(), store.clone()).with_producer(producer);
        Self {
            config: Arc::new(config),
            gateway: Arc::new(gateway),
            store,
            auth: Arc::new(HeaderAuth),
            started_at: Instant::now(),
        }
    }

    pub fn with_auth(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = auth;
        self
    }
}
