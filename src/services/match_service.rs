//! Orchestration between the WebSocket transport and the match lifecycle
//! core: every mutation goes through the registry here, and every
//! core-produced result is fanned out to the two connected players.

use std::time::Duration;

use axum::extract::ws::Message;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        game::{GameOverPayload, OpponentInfo, RoundResultPayload, RoundStartPayload},
        ws::ServerMessage,
    },
    error::ServiceError,
    services::now_unix_millis,
    state::{
        SharedState,
        game::{GameResult, RoundResult},
        registry::EnqueueOutcome,
    },
};

/// Extra delay on top of the round time limit before the forced timeout
/// fires, absorbing client and network latency around the deadline.
const TIMEOUT_GRACE: Duration = Duration::from_millis(500);

/// Queue the player for matchmaking and notify everyone affected.
pub fn enqueue_player(state: &SharedState, player_id: &str) {
    match state.registry().enqueue(player_id) {
        EnqueueOutcome::Waiting => send_to_player(state, player_id, &ServerMessage::Queued),
        EnqueueOutcome::AlreadyMatched => {
            let err = ServiceError::AlreadyMatched(player_id.to_string());
            send_to_player(
                state,
                player_id,
                &ServerMessage::Error {
                    message: err.to_string(),
                },
            );
        }
        EnqueueOutcome::Paired(match_id) => announce_match(state, match_id),
    }
}

/// Open the next round of a match and broadcast it to both players.
///
/// Fails with [`ServiceError::NoSuchMatch`] on an unknown identifier and
/// with [`ServiceError::InvalidTransition`] on a finished match or while a
/// round is still in flight.
pub fn start_round(state: &SharedState, match_id: Uuid) -> Result<(), ServiceError> {
    let now = now_unix_millis();
    let (opened, player_a, player_b) = state
        .registry()
        .with_match(match_id, |m| {
            m.start_next_round(now)
                .map(|opened| (opened, m.player_a.clone(), m.player_b.clone()))
        })
        .ok_or(ServiceError::NoSuchMatch(match_id))??;

    let round_number = opened.round_number;
    let time_limit = Duration::from_secs(u64::from(opened.time_limit_secs));
    info!(match_id = %match_id, round = round_number, "round started");

    let message = ServerMessage::RoundStart(RoundStartPayload::from(opened));
    for player in [&player_a, &player_b] {
        send_to_player(state, player, &message);
    }

    schedule_forced_timeout(state, match_id, round_number, time_limit + TIMEOUT_GRACE);
    Ok(())
}

/// Record a player's answer, stamped with the receive time, and broadcast
/// the round outcome if this submission resolved it.
///
/// Stale or future round numbers are silently ignored by the core; only an
/// unknown match identifier is an error.
pub fn submit_answer(
    state: &SharedState,
    player_id: &str,
    match_id: Uuid,
    round_number: usize,
    answer: &str,
) -> Result<(), ServiceError> {
    let answered_at = now_unix_millis();
    let resolved = state
        .registry()
        .with_match(match_id, |m| {
            m.submit_answer(player_id, round_number, answer, answered_at)
        })
        .ok_or(ServiceError::NoSuchMatch(match_id))?;

    if let Some(result) = resolved {
        broadcast_round_outcome(state, match_id, result);
    }
    Ok(())
}

/// Resolve the round by timeout if it is still open.
///
/// Safe to call late or repeatedly: the core rejects stale round numbers and
/// non-playing matches, so a timer racing a genuine resolution is a no-op.
pub fn force_timeout(state: &SharedState, match_id: Uuid, round_number: usize) {
    let now = now_unix_millis();
    let resolved = state
        .registry()
        .with_match(match_id, |m| m.force_timeout(round_number, now))
        .flatten();

    if let Some(result) = resolved {
        info!(match_id = %match_id, round = round_number, "round resolved by timeout");
        broadcast_round_outcome(state, match_id, result);
    }
}

/// Final result of a finished match, for the REST lookup.
pub fn game_result(state: &SharedState, match_id: Uuid) -> Result<GameResult, ServiceError> {
    state
        .registry()
        .with_match(match_id, |m| m.game_result())
        .ok_or(ServiceError::NoSuchMatch(match_id))?
        .ok_or_else(|| ServiceError::InvalidState(format!("match `{match_id}` has not finished yet")))
}

/// React to a player's socket going away: drop them from the queue, forfeit
/// their active match, and tell the opponent.
pub fn handle_disconnect(state: &SharedState, player_id: &str) {
    let Some(outcome) = state.registry().forfeit(player_id) else {
        return;
    };

    info!(match_id = %outcome.match_id, player = %player_id, "player left mid-match");
    send_to_player(
        state,
        &outcome.opponent,
        &ServerMessage::OpponentLeft {
            match_id: outcome.match_id,
        },
    );
    send_to_player(
        state,
        &outcome.opponent,
        &ServerMessage::GameOver(GameOverPayload::from(outcome.result)),
    );
}

/// Tell both players they have been paired, each with the other's info.
fn announce_match(state: &SharedState, match_id: Uuid) {
    let Some((player_a, player_b)) = state
        .registry()
        .with_match(match_id, |m| (m.player_a.clone(), m.player_b.clone()))
    else {
        return;
    };

    for (player, opponent) in [(&player_a, &player_b), (&player_b, &player_a)] {
        let message = ServerMessage::MatchStart {
            match_id,
            opponent: opponent_info(state, opponent),
        };
        send_to_player(state, player, &message);
    }
}

/// Display info for `player_id`, falling back to the bare identifier when
/// the connection registry has nothing better.
fn opponent_info(state: &SharedState, player_id: &str) -> OpponentInfo {
    state
        .connections()
        .get(player_id)
        .map(|conn| OpponentInfo {
            id: conn.id.clone(),
            name: conn.name.clone(),
            photo_url: conn.photo_url.clone(),
        })
        .unwrap_or_else(|| OpponentInfo {
            id: player_id.to_string(),
            name: player_id.to_string(),
            photo_url: None,
        })
}

/// Send a round result to both players, plus the game-over payload when the
/// resolution finished the match.
fn broadcast_round_outcome(state: &SharedState, match_id: Uuid, result: RoundResult) {
    let Some((player_a, player_b)) = state
        .registry()
        .with_match(match_id, |m| (m.player_a.clone(), m.player_b.clone()))
    else {
        return;
    };

    let finished = result.match_finished;
    let message = ServerMessage::RoundResult(RoundResultPayload::from(result));
    for player in [&player_a, &player_b] {
        send_to_player(state, player, &message);
    }

    if finished {
        let Some(final_result) = state
            .registry()
            .with_match(match_id, |m| m.game_result())
            .flatten()
        else {
            return;
        };
        info!(match_id = %match_id, "match finished");
        let message = ServerMessage::GameOver(GameOverPayload::from(final_result));
        for player in [&player_a, &player_b] {
            send_to_player(state, player, &message);
        }
    }
}

/// Spawn the forced-resolution timer for a round that just opened.
///
/// No cancellation is needed when the round resolves early; the fired
/// callback is a safe no-op against an advanced or finished match.
fn schedule_forced_timeout(
    state: &SharedState,
    match_id: Uuid,
    round_number: usize,
    delay: Duration,
) {
    let state = state.clone();
    tokio::spawn(async move {
        sleep(delay).await;
        force_timeout(&state, match_id, round_number);
    });
}

/// Serialize a payload and push it onto the player's writer channel.
///
/// A missing connection or closed writer only gets a debug log: the player
/// may legitimately be gone, and match progress must not depend on them.
pub(crate) fn send_to_player(state: &SharedState, player_id: &str, message: &ServerMessage) {
    let Some(tx) = state
        .connections()
        .get(player_id)
        .map(|conn| conn.tx.clone())
    else {
        debug!(player = %player_id, "dropping message for a disconnected player");
        return;
    };

    let payload = match serde_json::to_string(message) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "failed to serialize server message `{message:?}`");
            return;
        }
    };

    if tx.send(Message::Text(payload.into())).is_err() {
        debug!(player = %player_id, "writer task gone; dropping message");
    }
}
