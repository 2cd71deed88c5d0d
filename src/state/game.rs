//! Core data model for a two-player trivia duel.

use std::collections::HashMap;

use uuid::Uuid;

/// One guess-the-source-media question drawn from the catalog.
///
/// Rounds are immutable once a match has been created; the correct answer is
/// always one of the listed options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    /// Opaque locator for the media the players have to identify.
    pub media_url: String,
    /// Ordered answer options presented to both players (unique per round).
    pub options: Vec<String>,
    /// The option that scores points.
    pub answer: String,
}

/// Lifecycle phase of a match. Transitions are monotonic:
/// `Waiting → Playing → Finished`, never backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    /// Created by the matchmaking queue; no round has started yet.
    Waiting,
    /// Rounds are being played.
    Playing,
    /// Terminal. Either all rounds resolved or a player forfeited.
    Finished,
}

/// Why a match reached the `Finished` phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    /// Every round of the match was resolved.
    Completed,
    /// A player left mid-match; remaining rounds were skipped.
    Forfeit {
        /// Identifier of the player who forfeited.
        by: String,
    },
}

/// Aggregate state of one two-player match.
///
/// All mutation goes through the state-machine operations in
/// [`crate::state::state_machine`]; the registry wraps each match in its own
/// mutex so those operations are serialized per match.
#[derive(Debug, Clone)]
pub struct MatchState {
    /// Unique identifier, generated at creation.
    pub id: Uuid,
    /// First paired player.
    pub player_a: String,
    /// Second paired player, always distinct from `player_a`.
    pub player_b: String,
    /// Fixed round sequence, length = min(requested count, catalog size).
    pub(crate) rounds: Vec<Round>,
    /// 0 before the first round, 1..=N during play, frozen once finished.
    pub current_round: usize,
    /// Lifecycle phase.
    pub phase: MatchPhase,
    /// Seconds allowed per round, fixed for the whole match.
    pub time_limit_secs: u32,
    /// Unix-millisecond timestamp of the current round's start.
    ///
    /// `Some` exactly while a round is open; cleared on resolution, so it
    /// doubles as the "round in flight" flag. "Unset" is not "zero".
    pub round_started_at: Option<u64>,
    /// Most recent round-start anchor, kept across resolutions for the
    /// retention sweep. `None` until the first round starts.
    pub last_activity_at: Option<u64>,
    /// Accumulated points per player. Never decreases.
    pub(crate) scores: HashMap<String, u32>,
    /// Not-yet-resolved answers for the current round only.
    pub(crate) pending_answers: HashMap<String, String>,
    /// Set exactly once, when the match finishes.
    pub end_reason: Option<EndReason>,
}

impl MatchState {
    /// Build a fresh match in the `Waiting` phase with zeroed scores.
    pub fn new(player_a: &str, player_b: &str, rounds: Vec<Round>, time_limit_secs: u32) -> Self {
        let scores = HashMap::from([(player_a.to_string(), 0), (player_b.to_string(), 0)]);
        Self {
            id: Uuid::new_v4(),
            player_a: player_a.to_string(),
            player_b: player_b.to_string(),
            rounds,
            current_round: 0,
            phase: MatchPhase::Waiting,
            time_limit_secs,
            round_started_at: None,
            last_activity_at: None,
            scores,
            pending_answers: HashMap::new(),
            end_reason: None,
        }
    }

    /// Number of rounds this match was created with.
    pub fn round_count(&self) -> usize {
        self.rounds.len()
    }

    /// Whether the given identifier is one of the two paired players.
    pub fn is_participant(&self, player_id: &str) -> bool {
        player_id == self.player_a || player_id == self.player_b
    }

    /// The other player of the pair, if `player_id` participates at all.
    pub fn opponent_of(&self, player_id: &str) -> Option<&str> {
        if player_id == self.player_a {
            Some(&self.player_b)
        } else if player_id == self.player_b {
            Some(&self.player_a)
        } else {
            None
        }
    }

    /// Current score snapshot for both players.
    pub fn scores(&self) -> HashMap<String, u32> {
        self.scores.clone()
    }
}

/// Everything the transport needs to announce a freshly started round.
#[derive(Debug, Clone)]
pub struct RoundStart {
    /// 1-based number of the round that just started.
    pub round_number: usize,
    /// Media locator of the round.
    pub media_url: String,
    /// Answer options in catalog order.
    pub options: Vec<String>,
    /// Seconds both players have to answer.
    pub time_limit_secs: u32,
}

/// Snapshot emitted when a round resolves. Not stored anywhere.
#[derive(Debug, Clone)]
pub struct RoundResult {
    /// 1-based number of the resolved round.
    pub round_number: usize,
    /// The answer that scored points.
    pub correct_answer: String,
    /// Scores after this round, keyed by player identifier.
    pub scores: HashMap<String, u32>,
    /// Answers recorded for this round; may miss a player (or both, on a
    /// forced timeout nobody answered).
    pub answers: HashMap<String, String>,
    /// True when this resolution also finished the match.
    pub match_finished: bool,
}

/// Outcome of a finished match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The named player holds the strictly higher score.
    Winner(String),
    /// Both players finished on the same score.
    Tie,
}

/// Final snapshot of a finished match. Not stored anywhere.
#[derive(Debug, Clone)]
pub struct GameResult {
    /// Identifier of the finished match.
    pub match_id: Uuid,
    /// Final (frozen) scores, keyed by player identifier.
    pub scores: HashMap<String, u32>,
    /// Winner or tie marker.
    pub outcome: MatchOutcome,
    /// Whether the match completed normally or ended on a forfeit.
    pub reason: EndReason,
}
