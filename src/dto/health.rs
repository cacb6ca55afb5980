use std::time::SystemTime;

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    services::orchestrator::GameSnapshot,
    state::{room::Room, state_machine::GamePhase},
};

use super::format_system_time;

/// Liveness payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always "ok" while the process serves requests.
    pub status: String,
    /// Time of the check, RFC 3339.
    pub timestamp: String,
    /// Headline counters.
    pub stats: HealthStats,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok(stats: HealthStats) -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: format_system_time(SystemTime::now()),
            stats,
        }
    }
}

/// Headline counters embedded in the health payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthStats {
    /// Players currently registered.
    pub total_players: usize,
    /// Rooms with at least one member.
    pub active_rooms: usize,
    /// Games currently running.
    pub active_games: usize,
}

/// Server-wide statistics returned by `/api/stats`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    /// Players currently registered, connected or not.
    pub total_players: usize,
    /// Rooms with at least one member.
    pub total_rooms: usize,
    /// Games currently running.
    pub active_games: usize,
    /// One entry per room with members.
    pub rooms: Vec<RoomStats>,
    /// One entry per running game.
    pub games: Vec<GameStats>,
}

/// Summary of one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomStats {
    /// Room identifier.
    pub room_id: Uuid,
    /// Seats taken, including disconnected members.
    pub player_count: usize,
    /// Whether the room's game has started.
    pub is_game_started: bool,
}

impl From<&Room> for RoomStats {
    fn from(room: &Room) -> Self {
        Self {
            room_id: room.id,
            player_count: room.player_ids.len(),
            is_game_started: room.is_game_started,
        }
    }
}

/// Summary of one running game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameStats {
    /// Game identifier.
    pub game_id: Uuid,
    /// Room hosting the game.
    pub room_id: Uuid,
    /// Round in progress, 0 before the first one.
    pub current_round: u32,
    /// Current phase.
    pub phase: GamePhase,
    /// Players in the game's roster.
    pub player_count: usize,
}

impl From<GameSnapshot> for GameStats {
    fn from(snapshot: GameSnapshot) -> Self {
        Self {
            game_id: snapshot.game_id,
            room_id: snapshot.room_id,
            current_round: snapshot.current_round,
            phase: snapshot.phase,
            player_count: snapshot.player_count,
        }
    }
}

/// Detail view of a single room returned by `/api/rooms/{room_id}`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomDetailResponse {
    /// Summary shared with `/api/stats`.
    #[serde(flatten)]
    pub room: RoomStats,
    /// Players still connected.
    pub connected_players: usize,
    /// Lower bound to start a game.
    pub min_players: usize,
    /// Membership cap.
    pub max_players: usize,
    /// Running game, if any.
    pub game: Option<GameStats>,
    /// Players that must still cross in the current round.
    pub required_players: Option<usize>,
}
