use std::fmt;

use cvx_ledger::LedgerError;

/// System faults raised while processing a submission.
///
/// A denied submission is not an error; see [`crate::Submission::Denied`].
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// The entitlement read or ledger append failed.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// The artifact producer reported a failure.
    #[error("production failed in '{producer}': {message}")]
    Production { producer: String, message: String },

    /// Configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

impl GateError {
    /// Create a production error with a producer name and message.
    pub fn production(producer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Production {
            producer: producer.into(),
            message: message.into(),
        }
    }
}

impl PartialEq for GateError {
    fn eq(&self, other: &Self) -> bool {
        // Compare by display representation for test convenience.
        fmt::format(format_args!("{self}")) == fmt::format(format_args!("{other}"))
    }
}

impl Eq for GateError {}
