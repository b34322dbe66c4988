//! Request and response bodies.

use cvx_types::{Entitlement, RequestRecord, UserAccount, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub status: String,
    pub message: String,
    pub request_id: String,
    pub download_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub history: Vec<RequestRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntryResponse {
    pub request_id: String,
    pub download_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub user_id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub payment_status: Entitlement,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentRequest {
    pub user_id: UserId,
    pub payment_status: Entitlement,
}

/// Echo of an account after an administrative change.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub message: String,
    pub user: Option<UserAccount>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}
