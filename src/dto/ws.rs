use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::game::{GameOverPayload, OpponentInfo, RoundResultPayload, RoundStartPayload};

#[derive(Debug, Deserialize, Serialize, ToSchema)]
/// Messages accepted from player WebSocket clients.
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Identification, required as the first message on every connection.
    #[serde(rename = "join")]
    Join {
        /// Player identifier, unique per player.
        id: String,
        /// Display name shown to the opponent.
        name: String,
        /// Optional avatar reference.
        #[serde(default)]
        photo_url: Option<String>,
    },
    /// Ask to be paired with another waiting player.
    #[serde(rename = "enqueue")]
    Enqueue,
    /// Request the next round of the given match.
    #[serde(rename = "start_round")]
    StartRound {
        /// Match to advance.
        match_id: Uuid,
    },
    /// Submit an answer for the current round.
    #[serde(rename = "answer")]
    Answer {
        /// Match the answer belongs to.
        match_id: Uuid,
        /// Round the answer is meant for; stale numbers are ignored.
        round_number: usize,
        /// The chosen option.
        answer: String,
    },
    /// Anything this server version does not understand.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Serialize, ToSchema)]
/// Messages pushed to player WebSocket clients.
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Positive acknowledgement of a join.
    #[serde(rename = "joined")]
    Joined {
        /// Echo of the accepted player identifier.
        id: String,
    },
    /// The player is waiting for an opponent.
    #[serde(rename = "queued")]
    Queued,
    /// Two players were paired into a match.
    #[serde(rename = "match_start")]
    MatchStart {
        /// Identifier of the new match.
        match_id: Uuid,
        /// Who the player is up against.
        opponent: OpponentInfo,
    },
    /// A round just opened.
    #[serde(rename = "round_start")]
    RoundStart(RoundStartPayload),
    /// A round resolved.
    #[serde(rename = "round_result")]
    RoundResult(RoundResultPayload),
    /// The match is over.
    #[serde(rename = "game_over")]
    GameOver(GameOverPayload),
    /// The opponent disconnected mid-match.
    #[serde(rename = "opponent_left")]
    OpponentLeft {
        /// Match the opponent abandoned.
        match_id: Uuid,
    },
    /// Request-level failure the client should surface.
    #[serde(rename = "error")]
    Error {
        /// Human-readable description.
        message: String,
    },
}
