use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// HTTP endpoint paths.
pub mod endpoints {
    pub const SUBMIT_REGION: &str = "/api/data/region";
    pub const SUBMIT_PATH: &str = "/api/data/path";
    pub const HISTORY: &str = "/api/user/history";
    pub const HISTORY_ENTRY: &str = "/api/user/history/:request_id";
    pub const CREATE_USER: &str = "/api/test/create-user";
    pub const UPDATE_PAYMENT: &str = "/api/test/update-payment";
    pub const HEALTH: &str = "/v1/health";
    pub const INFO: &str = "/v1/info";
}

/// Build the axum router with all Civilytix endpoints.
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route(endpoints::HEALTH, get(handler::health_handler))
        .route(endpoints::INFO, get(handler::info_handler))
        .route(endpoints::SUBMIT_REGION, post(handler::submit_region_handler))
        .route(endpoints::SUBMIT_PATH, post(handler::submit_path_handler))
        .route(endpoints::HISTORY, get(handler::history_handler))
        .route(endpoints::HISTORY_ENTRY, get(handler::history_entry_handler));

    if state.config.enable_admin_routes {
        router = router
            .route(endpoints::CREATE_USER, post(handler::create_user_handler))
            .route(endpoints::UPDATE_PAYMENT, post(handler::update_payment_handler));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
