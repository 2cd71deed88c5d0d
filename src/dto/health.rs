use serde::Serialize;
use utoipa::ToSchema;

use crate::state::registry::RegistryStats;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status, always "ok" while the process is serving.
    pub status: String,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// Registry snapshot returned by the `/stats` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    /// Matches currently being played.
    pub active_matches: usize,
    /// Players waiting to be paired.
    pub waiting_players: usize,
    /// Tracked matches in any state.
    pub total_matches: usize,
}

impl From<RegistryStats> for StatsResponse {
    fn from(value: RegistryStats) -> Self {
        Self {
            active_matches: value.active_matches,
            waiting_players: value.waiting_players,
            total_matches: value.total_matches,
        }
    }
}
