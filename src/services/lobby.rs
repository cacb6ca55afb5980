//! Room admission, start countdown and game creation.

use std::time::Duration;

use dashmap::mapref::entry::Entry;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::{
    dto::ws::{GameCountdownPayload, GameStartedPayload, ServerMessage},
    error::ServiceError,
    services::{orchestrator::Session, room_events, session_runner},
    state::{
        SharedState,
        clock::Clock,
        game::{ConnectionId, GameId, GameState, RoomId},
        player::Player,
    },
};

/// Result of placing a new connection into a room.
#[derive(Debug, Clone)]
pub struct Admission {
    /// Player created for the connection.
    pub player: Player,
    /// Room the player was placed in.
    pub room_id: RoomId,
}

/// Create a player for `connection_id` and place it in an open room.
pub async fn admit(state: &SharedState, connection_id: ConnectionId) -> Result<Admission, ServiceError> {
    let _gate = state.admission_gate().lock().await;

    let room = state.rooms().find_or_create_available_room();
    let player = state.players().create_player(connection_id, room.id);
    if !state.rooms().add_player_to_room(&room.id, player.id) {
        state.players().remove_player(&player.id);
        return Err(ServiceError::InvalidState(format!(
            "room `{}` cannot take more players",
            room.id
        )));
    }

    info!(
        room_id = %room.id,
        player_id = %player.id,
        username = %player.username,
        "player joined room"
    );
    Ok(Admission {
        player,
        room_id: room.id,
    })
}

/// True when the room has not started and enough of its members are still connected.
pub fn has_quorum(state: &SharedState, room_id: &RoomId) -> bool {
    state.rooms().can_start_game(room_id)
        && state.rooms().get(room_id).is_some_and(|room| {
            state.players().connected_players_in_room(room_id).len() >= room.min_players
        })
}

/// React to a new member: start a full room now, otherwise arm the start countdown.
pub async fn on_player_joined(state: &SharedState, room_id: RoomId) {
    if !has_quorum(state, &room_id) {
        return;
    }

    if state.rooms().get(&room_id).is_some_and(|room| room.is_full()) {
        start_game(state, room_id).await;
    } else {
        ensure_countdown(state, room_id);
    }
}

/// Start the countdown for `room_id` unless one is already running.
pub fn ensure_countdown(state: &SharedState, room_id: RoomId) {
    if let Entry::Vacant(slot) = state.countdowns().entry(room_id) {
        slot.insert(tokio::spawn(run_countdown(state.clone(), room_id)));
    }
}

/// Stop a pending countdown, if any.
pub fn cancel_countdown(state: &SharedState, room_id: &RoomId) {
    if let Some((_, countdown)) = state.countdowns().remove(room_id) {
        countdown.abort();
        debug!(room_id = %room_id, "countdown cancelled");
    }
}

async fn run_countdown(state: SharedState, room_id: RoomId) {
    let seconds = state.config().rooms().start_countdown_secs;
    info!(room_id = %room_id, seconds, "start countdown running");

    for remaining in (1..=seconds).rev() {
        room_events::broadcast_to_room(
            &state,
            &room_id,
            &ServerMessage::GameCountdown(GameCountdownPayload::new(remaining)),
        );
        sleep(Duration::from_secs(1)).await;
    }

    state.countdowns().remove(&room_id);
    start_game(&state, room_id).await;
}

/// Start the room's game if it is allowed to. Returns the new game's id.
pub async fn start_game(state: &SharedState, room_id: RoomId) -> Option<GameId> {
    let _gate = state.admission_gate().lock().await;
    cancel_countdown(state, &room_id);

    if !has_quorum(state, &room_id) || !state.rooms().start_game(&room_id) {
        debug!(room_id = %room_id, "game start skipped");
        return None;
    }
    let roster = state
        .players()
        .connected_players_in_room(&room_id)
        .iter()
        .map(|player| player.id)
        .collect::<Vec<_>>();

    let config = state.config();
    let game = GameState::new(
        room_id,
        roster,
        config.total_rounds(),
        state.clock().now(),
    );
    let game_id = game.id;
    state.rooms().attach_game(&room_id, game_id);

    info!(
        room_id = %room_id,
        game_id = %game_id,
        players = game.roster.len(),
        "game started"
    );
    room_events::broadcast_to_room(
        state,
        &room_id,
        &ServerMessage::GameStarted(GameStartedPayload {
            game_id,
            total_rounds: game.total_rounds,
        }),
    );
    room_events::broadcast_room_state(state, &room_id);

    let session = Session::new(
        game,
        state.players().clone(),
        state.questions().clone(),
        config.timings(),
    );
    let handle = session_runner::spawn(state, session);
    state.sessions().insert(room_id, handle);
    Some(game_id)
}
