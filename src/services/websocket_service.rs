use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, warn};

use crate::{
    dto::ws::{ClientMessage, ServerMessage},
    services::match_service,
    state::{PlayerConnection, SharedState, state_machine::TIMEOUT_SUBMITTER},
};

const IDENT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_PLAYER_ID_LEN: usize = 64;

/// Handle the full lifecycle for an individual player WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let initial_message = match tokio::time::timeout(IDENT_TIMEOUT, receiver.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => text,
        Ok(Some(Ok(Message::Close(_)))) => {
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Ok(_))) => {
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Err(err))) => {
            warn!(error = %err, "websocket receive error");
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(None) | Err(_) => {
            warn!("websocket identification timed out");
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let Ok(ClientMessage::Join {
        id: player_id,
        name,
        photo_url,
    }) = serde_json::from_str::<ClientMessage>(&initial_message)
    else {
        warn!("first message was not a valid join");
        let _ = outbound_tx.send(Message::Close(None));
        finalize(writer_task, outbound_tx).await;
        return;
    };

    if !is_valid_player_id(&player_id) || name.trim().is_empty() {
        warn!(id = %player_id, "rejecting join with an invalid identity");
        let _ = outbound_tx.send(Message::Close(None));
        finalize(writer_task, outbound_tx).await;
        return;
    }

    state.connections().insert(
        player_id.clone(),
        PlayerConnection {
            id: player_id.clone(),
            name,
            photo_url,
            tx: outbound_tx.clone(),
        },
    );
    info!(id = %player_id, "player connected");
    match_service::send_to_player(
        &state,
        &player_id,
        &ServerMessage::Joined {
            id: player_id.clone(),
        },
    );

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => dispatch(&state, &player_id, &text),
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(id = %player_id, "player closed the connection");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) | Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(id = %player_id, error = %err, "websocket error");
                break;
            }
        }
    }

    // Only this connection's registration may be cleared; the player might
    // already be back on a fresh socket.
    let still_registered = state
        .connections()
        .remove_if(&player_id, |_, conn| conn.tx.same_channel(&outbound_tx))
        .is_some();
    if still_registered {
        info!(id = %player_id, "player disconnected");
        match_service::handle_disconnect(&state, &player_id);
    }

    finalize(writer_task, outbound_tx).await;
}

/// Route one parsed client message into the match service.
fn dispatch(state: &SharedState, player_id: &str, text: &str) {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(err) => {
            warn!(id = %player_id, error = %err, "failed to parse client message");
            return;
        }
    };

    let result = match message {
        ClientMessage::Enqueue => {
            match_service::enqueue_player(state, player_id);
            Ok(())
        }
        ClientMessage::StartRound { match_id } => match_service::start_round(state, match_id),
        ClientMessage::Answer {
            match_id,
            round_number,
            answer,
        } => match_service::submit_answer(state, player_id, match_id, round_number, &answer),
        ClientMessage::Join { .. } => {
            warn!(id = %player_id, "ignoring duplicate join message");
            Ok(())
        }
        ClientMessage::Unknown => {
            warn!(id = %player_id, "ignoring unknown client message");
            Ok(())
        }
    };

    if let Err(err) = result {
        warn!(id = %player_id, error = %err, "client request failed");
        match_service::send_to_player(
            state,
            player_id,
            &ServerMessage::Error {
                message: err.to_string(),
            },
        );
    }
}

/// Player identifiers are free-form but bounded, and may not shadow the
/// reserved timeout identity.
fn is_valid_player_id(value: &str) -> bool {
    !value.trim().is_empty() && value.len() <= MAX_PLAYER_ID_LEN && value != TIMEOUT_SUBMITTER
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
