use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Quiz Clash Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::health::stats,
        crate::routes::game::game_result,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::StatsResponse,
            crate::dto::ws::ClientMessage,
            crate::dto::ws::ServerMessage,
            crate::dto::game::OpponentInfo,
            crate::dto::game::RoundStartPayload,
            crate::dto::game::RoundResultPayload,
            crate::dto::game::GameOverPayload,
            crate::dto::game::EndReasonPayload,
        )
    ),
    tags(
        (name = "health", description = "Health check and monitoring endpoints"),
        (name = "games", description = "Read-only match lookups"),
        (name = "players", description = "WebSocket operations for player clients"),
    )
)]
pub struct ApiDoc;
