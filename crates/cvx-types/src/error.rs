use thiserror::Error;

/// Errors produced by type construction and parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("user identifier must not be empty")]
    EmptyUserId,

    #[error("invalid request identifier: {0}")]
    InvalidRequestId(String),
}
