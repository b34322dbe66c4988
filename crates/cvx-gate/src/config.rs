use std::fmt;

use cvx_types::DEFAULT_VECTOR_DATA_TYPES;
use serde::{Deserialize, Serialize};

use crate::error::GateError;

/// When the artifact producer runs relative to the caller's reply.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductionPolicy {
    /// Record the request, reply with the expected location, and hand the job
    /// to the producer in the background. The reply is a promise.
    #[default]
    Deferred,
    /// Wait for the producer to finish before recording and replying. A
    /// producer failure leaves no ledger entry.
    AwaitArtifact,
}

impl fmt::Display for ProductionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deferred => f.write_str("deferred"),
            Self::AwaitArtifact => f.write_str("await_artifact"),
        }
    }
}

/// Configuration for the extraction gateway.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Prefix of every result reference; `<base>/<user>/<request>.<ext>`.
    pub result_base_url: String,
    /// Whether replies wait for the artifact.
    pub production: ProductionPolicy,
    /// Data types delivered as GeoJSON; everything else is GeoTIFF.
    pub vector_data_types: Vec<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            result_base_url: "https://storage.cloud.com/results".into(),
            production: ProductionPolicy::default(),
            vector_data_types: DEFAULT_VECTOR_DATA_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl GateConfig {
    /// Reject configurations that would mint unusable result references.
    pub fn validate(&self) -> Result<(), GateError> {
        let base = self.result_base_url.trim();
        if base.is_empty() {
            return Err(GateError::Config("result_base_url must not be empty".into()));
        }
        if base.chars().any(char::is_whitespace) {
            return Err(GateError::Config(format!(
                "result_base_url contains whitespace: {base:?}"
            )));
        }
        if !base.contains("://") {
            return Err(GateError::Config(format!(
                "result_base_url must be an absolute URL: {base}"
            )));
        }
        Ok(())
    }
}
