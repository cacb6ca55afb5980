use std::time::SystemTime;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        unix_millis,
        ws::{
            ClientMessage, ExistingPlayersPayload, InboundError, PlayerInfoPayload,
            PlayerLeftPayload, PlayerMovedPayload, PlayerMovementPayload, PlayerSnapshot,
            ServerMessage,
        },
    },
    error::ServiceError,
    services::{
        lobby,
        room_events::{self, send_message_to_websocket},
        session_runner::SessionCommand,
    },
    state::{
        ClientConnection, SharedState,
        game::{ConnectionId, PlayerId, RoomId},
        player::Player,
    },
};

/// Per-connection failures. None of them is fatal to the server.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Writer channel closed; the connection should be terminated.
    #[error("connection closed")]
    ConnectionClosed,
    /// The frame could not be parsed or validated.
    #[error(transparent)]
    BadPayload(#[from] InboundError),
    /// The player behind the connection is no longer registered.
    #[error("unknown player `{0}`")]
    UnknownPlayer(PlayerId),
    /// Room admission failed.
    #[error("service error: {0}")]
    Service(#[from] ServiceError),
}

/// Identity of the player carried by a socket.
#[derive(Debug, Clone, Copy)]
struct Peer {
    connection_id: ConnectionId,
    player_id: PlayerId,
    room_id: RoomId,
}

/// Handle the full lifecycle of a game client WebSocket connection.
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

    let peer = match connect(&state, &outbound_tx).await {
        Ok(peer) => peer,
        Err(err) => {
            warn!(error = %err, "failed to admit connection");
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                debug!(player_id = %peer.player_id, payload = %text.as_str(), "received client message");
                let result = match ClientMessage::from_json_str(text.as_str()) {
                    Ok(message) => handle_client_message(&state, peer, message).await,
                    Err(err) => Err(GatewayError::from(err)),
                };
                if let Err(err) = result {
                    warn!(player_id = %peer.player_id, error = %err, "client message rejected");
                    if matches!(err, GatewayError::ConnectionClosed) {
                        break;
                    }
                }
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(player_id = %peer.player_id, "client closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(player_id = %peer.player_id, error = %err, "websocket error");
                break;
            }
        }
    }

    disconnect(&state, peer);
    finalize(writer_task, outbound_tx).await;
}

/// Admit the connection and introduce it to its room; the room's game may start as a result.
async fn connect(
    state: &SharedState,
    outbound_tx: &mpsc::UnboundedSender<Message>,
) -> Result<Peer, GatewayError> {
    let connection_id = Uuid::new_v4();
    let lobby::Admission { player, room_id } = lobby::admit(state, connection_id).await?;

    state.connections().insert(
        connection_id,
        ClientConnection {
            player_id: player.id,
            room_id,
            tx: outbound_tx.clone(),
        },
    );
    let peer = Peer {
        connection_id,
        player_id: player.id,
        room_id,
    };

    if let Err(err) = introduce(state, &player, outbound_tx) {
        disconnect(state, peer);
        return Err(err);
    }
    lobby::on_player_joined(state, room_id).await;

    Ok(peer)
}

fn introduce(
    state: &SharedState,
    player: &Player,
    outbound_tx: &mpsc::UnboundedSender<Message>,
) -> Result<(), GatewayError> {
    send_message_to_websocket(
        outbound_tx,
        &ServerMessage::PlayerInfo(PlayerInfoPayload::from(player)),
    )?;

    let existing = state
        .players()
        .connected_players_in_room(&player.room_id)
        .iter()
        .filter(|other| other.id != player.id)
        .map(PlayerSnapshot::from)
        .collect();
    send_message_to_websocket(
        outbound_tx,
        &ServerMessage::ExistingPlayers(ExistingPlayersPayload { players: existing }),
    )?;

    room_events::broadcast_except(
        state,
        &player.room_id,
        &player.id,
        &ServerMessage::PlayerJoined(PlayerSnapshot::from(player)),
    );
    room_events::broadcast_room_state(state, &player.room_id);
    Ok(())
}

async fn handle_client_message(
    state: &SharedState,
    peer: Peer,
    message: ClientMessage,
) -> Result<(), GatewayError> {
    match message {
        ClientMessage::PlayerMovement(payload) => handle_movement(state, peer, payload),
        ClientMessage::DoorCrossed => {
            forward_to_session(state, peer, SessionCommand::CrossDoor(peer.player_id));
            Ok(())
        }
        ClientMessage::RequestStartGame => {
            if lobby::start_game(state, peer.room_id).await.is_none() {
                debug!(room_id = %peer.room_id, "manual start refused");
            }
            Ok(())
        }
    }
}

/// Store the new position and relay it; a door during the answer window counts as a selection.
fn handle_movement(
    state: &SharedState,
    peer: Peer,
    payload: PlayerMovementPayload,
) -> Result<(), GatewayError> {
    let position = payload.position.into();
    state
        .players()
        .update_player_position(&peer.player_id, position, payload.door);
    let player = state
        .players()
        .get_by_connection(&peer.connection_id)
        .ok_or(GatewayError::UnknownPlayer(peer.player_id))?;

    if payload.door.is_some() {
        forward_to_session(state, peer, SessionCommand::SelectDoor(peer.player_id));
    }

    room_events::broadcast_except(
        state,
        &peer.room_id,
        &peer.player_id,
        &ServerMessage::PlayerMoved(PlayerMovedPayload {
            player_id: player.id,
            username: player.username,
            character: player.character,
            position,
            door: payload.door,
            timestamp: unix_millis(SystemTime::now()),
        }),
    );
    Ok(())
}

fn forward_to_session(state: &SharedState, peer: Peer, command: SessionCommand) {
    let Some(session) = state.sessions().get(&peer.room_id).map(|entry| entry.clone()) else {
        debug!(room_id = %peer.room_id, ?command, "no running game; command dropped");
        return;
    };
    if !session.send(command) {
        debug!(room_id = %peer.room_id, ?command, "game already stopped; command dropped");
    }
}

/// Forget the socket and mark the player disconnected; the record and room seat are kept.
fn disconnect(state: &SharedState, peer: Peer) {
    state.connections().remove(&peer.connection_id);
    let Some(player) = state.players().disconnect_player(&peer.connection_id) else {
        return;
    };
    info!(player_id = %player.id, room_id = %peer.room_id, "player disconnected");

    if !lobby::has_quorum(state, &peer.room_id) {
        lobby::cancel_countdown(state, &peer.room_id);
    }

    room_events::broadcast_to_room(
        state,
        &peer.room_id,
        &ServerMessage::PlayerLeft(PlayerLeftPayload {
            player_id: player.id,
            username: player.username,
        }),
    );
    room_events::broadcast_room_state(state, &peer.room_id);
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
