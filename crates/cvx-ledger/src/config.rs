use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Storage backend configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON snapshot loaded on open and written on flush/close.
    /// `None` keeps the ledger purely in memory.
    pub snapshot_path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn with_snapshot(path: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_path: Some(path.into()),
        }
    }
}
