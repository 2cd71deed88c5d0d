use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::health::{HealthResponse, StatsResponse},
    services::health_service,
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/healthcheck",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
/// Return the current health status of the backend.
pub async fn healthcheck() -> Json<HealthResponse> {
    Json(health_service::health_status())
}

#[utoipa::path(
    get,
    path = "/stats",
    responses((status = 200, description = "Registry snapshot", body = StatsResponse))
)]
/// Return a read-only snapshot of matches and waiting players.
pub async fn stats(State(state): State<SharedState>) -> Json<StatsResponse> {
    Json(health_service::registry_stats(&state))
}

/// Configure the health and monitoring routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/healthcheck", get(healthcheck))
        .route("/stats", get(stats))
}
