use crate::{
    dto::health::{HealthResponse, StatsResponse},
    state::SharedState,
};

/// Static health payload; the service has no external dependency to probe.
pub fn health_status() -> HealthResponse {
    HealthResponse::ok()
}

/// Read-only registry snapshot for the monitoring surface.
pub fn registry_stats(state: &SharedState) -> StatsResponse {
    state.registry().stats().into()
}
