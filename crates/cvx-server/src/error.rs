use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Message returned to callers without a paid entitlement.
pub const PAYMENT_REQUIRED_MESSAGE: &str =
    "Access denied. Please complete payment to use this feature.";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Access denied. Please complete payment to use this feature.")]
    PaymentRequired,

    #[error("{0}")]
    NotFound(String),

    /// The request body could not be read as the expected JSON shape.
    #[error("invalid request body: {message}")]
    InvalidBody { status: StatusCode, message: String },

    /// An administrative payload failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] cvx_ledger::LedgerError),

    #[error("gate error: {0}")]
    Gate(#[from] cvx_gate::GateError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::PaymentRequired => StatusCode::PAYMENT_REQUIRED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidBody { status, .. } => *status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::PaymentRequired => json!({
                "status": "error",
                "message": PAYMENT_REQUIRED_MESSAGE,
            }),
            other => json!({ "error": other.to_string() }),
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidBody {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
