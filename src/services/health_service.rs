use crate::{
    dto::health::{
        GameStats, HealthResponse, HealthStats, RoomDetailResponse, RoomStats, StatsResponse,
    },
    error::ServiceError,
    state::{SharedState, game::RoomId},
};

fn running_games(state: &SharedState) -> Vec<GameStats> {
    state
        .sessions()
        .iter()
        .map(|session| GameStats::from(session.snapshot()))
        .collect()
}

/// Report liveness with the headline counters.
pub fn health_status(state: &SharedState) -> HealthResponse {
    HealthResponse::ok(HealthStats {
        total_players: state.players().len(),
        active_rooms: state.rooms().active_rooms().len(),
        active_games: state.sessions().len(),
    })
}

/// Collect statistics over active rooms and running games.
pub fn stats(state: &SharedState) -> StatsResponse {
    let rooms = state
        .rooms()
        .active_rooms()
        .iter()
        .map(RoomStats::from)
        .collect::<Vec<_>>();
    let games = running_games(state);

    StatsResponse {
        total_players: state.players().len(),
        total_rooms: rooms.len(),
        active_games: games.len(),
        rooms,
        games,
    }
}

/// Describe one room, including its game when one is running.
pub fn room_stats(state: &SharedState, room_id: &RoomId) -> Result<RoomDetailResponse, ServiceError> {
    let room = state
        .rooms()
        .get(room_id)
        .ok_or_else(|| ServiceError::NotFound(format!("room `{room_id}`")))?;
    let snapshot = state
        .sessions()
        .get(room_id)
        .map(|session| session.snapshot());

    Ok(RoomDetailResponse {
        room: RoomStats::from(&room),
        connected_players: state.players().connected_players_in_room(room_id).len(),
        min_players: room.min_players,
        max_players: room.max_players,
        required_players: snapshot.as_ref().map(|snapshot| snapshot.required_players),
        game: snapshot.map(GameStats::from),
    })
}
