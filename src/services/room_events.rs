use axum::extract::ws::Message;
use tokio::sync::mpsc;
use tracing::warn;

use crate::{
    dto::ws::{RoomMember, RoomStatePayload, ServerMessage},
    services::websocket_service::GatewayError,
    state::{
        SharedState,
        game::{PlayerId, RoomId},
    },
};

/// Serialize a message and push it onto a connection's writer channel.
///
/// Serialization failures are logged and swallowed; a closed writer is reported so the
/// caller can drop the connection.
pub fn send_message_to_websocket(
    tx: &mpsc::UnboundedSender<Message>,
    message: &ServerMessage,
) -> Result<(), GatewayError> {
    let payload = match serde_json::to_string(message) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "failed to serialize message `{message:?}`");
            return Ok(());
        }
    };

    tx.send(Message::Text(payload.into()))
        .map_err(|_| GatewayError::ConnectionClosed)
}

/// Send a message to every connected member of a room.
pub fn broadcast_to_room(state: &SharedState, room_id: &RoomId, message: &ServerMessage) {
    fan_out(state, room_id, None, message);
}

/// Send a message to every connected member of a room except `excluded`.
pub fn broadcast_except(
    state: &SharedState,
    room_id: &RoomId,
    excluded: &PlayerId,
    message: &ServerMessage,
) {
    fan_out(state, room_id, Some(excluded), message);
}

/// Broadcast the room's membership and lobby status to its members.
pub fn broadcast_room_state(state: &SharedState, room_id: &RoomId) {
    let Some(room) = state.rooms().get(room_id) else {
        return;
    };

    let players = state
        .players()
        .connected_players_in_room(room_id)
        .iter()
        .map(RoomMember::from)
        .collect();

    let message = ServerMessage::RoomState(RoomStatePayload {
        room_id: room.id,
        players,
        is_game_started: room.is_game_started,
        min_players: room.min_players,
        max_players: room.max_players,
    });
    broadcast_to_room(state, room_id, &message);
}

fn fan_out(
    state: &SharedState,
    room_id: &RoomId,
    excluded: Option<&PlayerId>,
    message: &ServerMessage,
) {
    let payload = match serde_json::to_string(message) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "failed to serialize message `{message:?}`");
            return;
        }
    };

    let recipients = state
        .connections()
        .iter()
        .filter(|entry| entry.room_id == *room_id && Some(&entry.player_id) != excluded)
        .map(|entry| (*entry.key(), entry.tx.clone()))
        .collect::<Vec<_>>();

    for (connection_id, tx) in recipients {
        if tx.send(Message::Text(payload.clone().into())).is_err() {
            warn!(
                room_id = %room_id,
                connection_id = %connection_id,
                "writer closed; broadcast skipped"
            );
        }
    }
}
