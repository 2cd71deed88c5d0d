use std::collections::HashMap;

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::game::{EndReason, GameResult, MatchOutcome, RoundResult, RoundStart};

/// Public projection of the opponent shared at match start.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OpponentInfo {
    /// Opponent's player identifier.
    pub id: String,
    /// Opponent's display name.
    pub name: String,
    /// Opponent's avatar reference, if they set one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

/// Everything a client needs to render a freshly started round.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoundStartPayload {
    /// 1-based round number.
    pub round_number: usize,
    /// Media locator to play.
    pub media_url: String,
    /// Answer options in catalog order.
    pub options: Vec<String>,
    /// Seconds until the round is force-resolved.
    pub time_limit_seconds: u32,
}

impl From<RoundStart> for RoundStartPayload {
    fn from(value: RoundStart) -> Self {
        Self {
            round_number: value.round_number,
            media_url: value.media_url,
            options: value.options,
            time_limit_seconds: value.time_limit_secs,
        }
    }
}

/// Outcome of a resolved round, broadcast to both players verbatim.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoundResultPayload {
    /// 1-based number of the resolved round.
    pub round_number: usize,
    /// The answer that scored points.
    pub correct_answer: String,
    /// Scores after this round, keyed by player identifier.
    pub scores: HashMap<String, u32>,
    /// Answers recorded this round; absent players did not answer in time.
    pub answers: HashMap<String, String>,
}

impl From<RoundResult> for RoundResultPayload {
    fn from(value: RoundResult) -> Self {
        Self {
            round_number: value.round_number,
            correct_answer: value.correct_answer,
            scores: value.scores,
            answers: value.answers,
        }
    }
}

/// How a finished match ended, as exposed to clients.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EndReasonPayload {
    /// All rounds were played.
    Completed,
    /// A player left before the final round resolved.
    Forfeit,
}

impl From<&EndReason> for EndReasonPayload {
    fn from(value: &EndReason) -> Self {
        match value {
            EndReason::Completed => Self::Completed,
            EndReason::Forfeit { .. } => Self::Forfeit,
        }
    }
}

/// Final snapshot of a finished match, broadcast to both players.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameOverPayload {
    /// Identifier of the finished match.
    pub match_id: Uuid,
    /// Final scores, keyed by player identifier.
    pub scores: HashMap<String, u32>,
    /// Winner's identifier; `null` marks a tie.
    pub winner: Option<String>,
    /// Whether the match completed normally or ended on a forfeit.
    pub reason: EndReasonPayload,
}

impl From<GameResult> for GameOverPayload {
    fn from(value: GameResult) -> Self {
        let winner = match value.outcome {
            MatchOutcome::Winner(player) => Some(player),
            MatchOutcome::Tie => None,
        };
        Self {
            match_id: value.match_id,
            scores: value.scores,
            winner,
            reason: EndReasonPayload::from(&value.reason),
        }
    }
}
