use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Json;
use cvx_gate::Submission;
use cvx_ledger::{AccountRegistry, LedgerReader};
use cvx_types::{EndpointKind, RequestId, RequestParams, UserId};
use serde_json::{json, Value};

use crate::auth::AuthenticatedUser;
use crate::dto::{
    AccountResponse, CreateUserRequest, HealthResponse, HistoryEntryResponse, HistoryResponse,
    SubmitResponse, UpdatePaymentRequest,
};
use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Health check handler.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// Info handler.
pub async fn info_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "name": "civilytix",
        "version": env!("CARGO_PKG_VERSION"),
        "production": state.config.gate.production,
        "admin_routes": state.config.enable_admin_routes,
        "uptime_secs": state.started_at.elapsed().as_secs(),
    }))
}

pub async fn submit_region_handler(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    body: Result<Json<Value>, JsonRejection>,
) -> ServerResult<Json<SubmitResponse>> {
    let Json(body) = body?;
    submit(&state, &user, EndpointKind::Region, body).await
}

pub async fn submit_path_handler(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    body: Result<Json<Value>, JsonRejection>,
) -> ServerResult<Json<SubmitResponse>> {
    let Json(body) = body?;
    submit(&state, &user, EndpointKind::Path, body).await
}

async fn submit(
    state: &AppState,
    user: &UserId,
    endpoint: EndpointKind,
    body: Value,
) -> ServerResult<Json<SubmitResponse>> {
    match state
        .gateway
        .submit(user, endpoint, RequestParams::new(body))
        .await?
    {
        Submission::Confirmed(c) => Ok(Json(SubmitResponse {
            status: "success".into(),
            message: c.message().into(),
            request_id: c.request_id.to_string(),
            download_url: c.result_ref.to_string(),
        })),
        Submission::Denied { .. } => Err(ServerError::PaymentRequired),
    }
}

pub async fn history_handler(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> ServerResult<Json<HistoryResponse>> {
    match state.store.read_all(&user).await {
        Ok(history) => Ok(Json(HistoryResponse { history })),
        Err(e) if e.is_not_found() => Err(ServerError::NotFound("User not found".into())),
        Err(e) => Err(e.into()),
    }
}

/// Unknown users, unknown tickets and malformed tickets all produce the same
/// 404 so the route cannot be used to probe for account names.
pub async fn history_entry_handler(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(raw_id): Path<String>,
) -> ServerResult<Json<HistoryEntryResponse>> {
    let not_found = || ServerError::NotFound("Request not found".into());
    let request_id = RequestId::parse(&raw_id).map_err(|_| not_found())?;

    match state.store.read_one(&user, &request_id).await {
        Ok(record) => Ok(Json(HistoryEntryResponse {
            request_id: record.request_id.to_string(),
            download_url: record.result_ref.to_string(),
        })),
        Err(e) if e.is_not_found() => Err(not_found()),
        Err(e) => Err(e.into()),
    }
}

/// Admin payloads that fail to parse are reported as server-side validation
/// failures, not client errors.
fn admin_rejection(rejection: JsonRejection) -> ServerError {
    ServerError::Validation(rejection.body_text())
}

pub async fn create_user_handler(
    State(state): State<AppState>,
    req: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ServerResult<Json<AccountResponse>> {
    let Json(req) = req.map_err(admin_rejection)?;
    let account = state
        .store
        .provision_user(req.user_id, req.email, req.payment_status)
        .await?;
    Ok(Json(AccountResponse {
        message: "User created successfully".into(),
        user: Some(account),
    }))
}

pub async fn update_payment_handler(
    State(state): State<AppState>,
    req: Result<Json<UpdatePaymentRequest>, JsonRejection>,
) -> ServerResult<Json<AccountResponse>> {
    let Json(req) = req.map_err(admin_rejection)?;
    let account = state
        .store
        .set_entitlement(&req.user_id, req.payment_status)
        .await?;
    Ok(Json(AccountResponse {
        message: "Payment status updated successfully".into(),
        user: account,
    }))
}
