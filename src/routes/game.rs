use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::game::GameOverPayload, error::AppError, services::match_service, state::SharedState,
};

#[utoipa::path(
    get,
    path = "/games/{match_id}/result",
    params(("match_id" = Uuid, Path, description = "Match identifier")),
    responses(
        (status = 200, description = "Final result of a finished match", body = GameOverPayload),
        (status = 404, description = "Unknown match identifier"),
        (status = 409, description = "Match has not finished yet"),
    )
)]
/// Look up the final result of a finished match.
pub async fn game_result(
    State(state): State<SharedState>,
    Path(match_id): Path<Uuid>,
) -> Result<Json<GameOverPayload>, AppError> {
    let result = match_service::game_result(&state, match_id)?;
    Ok(Json(result.into()))
}

/// Configure the read-only match routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/games/{match_id}/result", get(game_result))
}
