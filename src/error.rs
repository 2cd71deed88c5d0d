use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::state::state_machine::InvalidTransition;

/// Errors that can occur in service layer operations.
///
/// Guard failures that are part of normal play (late answers, stale timers,
/// duplicate submissions) never reach this type; the core signals those by
/// returning an absent value. Only conditions the caller must act on
/// surface here.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The match identifier is unknown to the registry.
    #[error("no such match: `{0}`")]
    NoSuchMatch(Uuid),
    /// The player already maps to a non-finished match.
    #[error("player `{0}` is already in an active match")]
    AlreadyMatched(String),
    /// Operation cannot be applied in the match's current phase.
    #[error("invalid transition: {0}")]
    InvalidTransition(#[from] InvalidTransition),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NoSuchMatch(match_id) => {
                AppError::NotFound(format!("match `{match_id}` not found"))
            }
            ServiceError::AlreadyMatched(player) => {
                AppError::Conflict(format!("player `{player}` is already in an active match"))
            }
            ServiceError::InvalidTransition(invalid) => AppError::Conflict(invalid.to_string()),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
