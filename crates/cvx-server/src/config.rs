use std::net::SocketAddr;
use std::path::Path;

use cvx_gate::GateConfig;
use cvx_ledger::StorageConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Mount the account provisioning routes under `/api/test`.
    pub enable_admin_routes: bool,
    /// Header carrying the caller's already-verified user identifier.
    pub identity_header: String,
    pub gate: GateConfig,
    pub storage: StorageConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            enable_admin_routes: true,
            identity_header: "user-id".into(),
            gate: GateConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parse TOML; missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> ServerResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| ServerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ServerError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> ServerResult<String> {
        toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn validate(&self) -> ServerResult<()> {
        if axum::http::HeaderName::from_bytes(self.identity_header.as_bytes()).is_err() {
            return Err(ServerError::Config(format!(
                "invalid identity_header: {:?}",
                self.identity_header
            )));
        }
        self.gate
            .validate()
            .map_err(|e| ServerError::Config(e.to_string()))
    }
}
