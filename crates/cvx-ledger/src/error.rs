use cvx_types::{RequestId, UserId};

/// Errors produced by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    #[error("request {request_id} not found for user {user}")]
    RequestNotFound { user: UserId, request_id: RequestId },

    #[error("user already exists: {0}")]
    UserExists(UserId),

    #[error("request id already recorded: {0}")]
    DuplicateRequest(RequestId),

    #[error("ledger is closed")]
    Closed,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl LedgerError {
    /// Whether this is a lookup miss rather than a fault.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UserNotFound(_) | Self::RequestNotFound { .. })
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
