//! Messages exchanged with game clients over the WebSocket.
//!
//! Every frame is a JSON object `{"event": <name>, "data": <payload>}`; event names are
//! camelCase and payload fields follow the same convention.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::{Validate, ValidationErrors};

use crate::state::{
    game::{Door, GameId, Millis, PlayerId, Position, QuestionOptions, RoomId},
    player::{Player, RoundStats},
};

/// Reasons an inbound frame is rejected.
#[derive(Debug, Error)]
pub enum InboundError {
    /// Not JSON, or not a known event shape.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Well-formed but out of the accepted bounds.
    #[error("invalid message: {0}")]
    Invalid(#[from] ValidationErrors),
}

/// Intents sent by a game client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Position update, optionally standing in front of a door.
    PlayerMovement(PlayerMovementPayload),
    /// The player walked through the door they stand in front of.
    DoorCrossed,
    /// Ask for the room's game to start now.
    RequestStartGame,
}

impl ClientMessage {
    /// Parse and validate a text frame.
    pub fn from_json_str(text: &str) -> Result<Self, InboundError> {
        let message = serde_json::from_str::<Self>(text)?;
        if let Self::PlayerMovement(payload) = &message {
            payload.validate()?;
        }
        Ok(message)
    }
}

/// Payload of a `playerMovement` event.
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
pub struct PlayerMovementPayload {
    /// Reported map position.
    #[validate(nested)]
    pub position: PositionInput,
    /// Door the player is standing in front of, if any.
    #[serde(default)]
    pub door: Option<Door>,
}

/// Client-supplied coordinates, bounded to the playable area.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Validate)]
pub struct PositionInput {
    /// Horizontal coordinate.
    #[validate(range(min = -100000.0, max = 100000.0))]
    pub x: f64,
    /// Vertical coordinate.
    #[validate(range(min = -100000.0, max = 100000.0))]
    pub y: f64,
}

impl From<PositionInput> for Position {
    fn from(value: PositionInput) -> Self {
        Self {
            x: value.x,
            y: value.y,
        }
    }
}

/// Events pushed to game clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Identity assigned to the receiving connection.
    PlayerInfo(PlayerInfoPayload),
    /// Players already connected to the room.
    ExistingPlayers(ExistingPlayersPayload),
    /// Someone else joined the room.
    PlayerJoined(PlayerSnapshot),
    /// Membership and lobby status of the room.
    RoomState(RoomStatePayload),
    /// Seconds left before the game starts.
    GameCountdown(GameCountdownPayload),
    /// The room's game was created.
    GameStarted(GameStartedPayload),
    /// A round opened its movement window.
    MovementPhase(MovementPhasePayload),
    /// Question of the round, correct answer withheld.
    NewQuestion(NewQuestionPayload),
    /// A player crossed a door this round.
    PlayerCrossedDoor(PlayerCrossedDoorPayload),
    /// Players who failed to cross before the deadline.
    PlayersEliminated(PlayersEliminatedPayload),
    /// Correct answer, score changes and standings.
    AnswerRevealed(AnswerRevealedPayload),
    /// A round finished.
    RoundEnded(RoundEndedPayload),
    /// Final standings.
    GameOver(GameOverPayload),
    /// Someone else moved.
    PlayerMoved(PlayerMovedPayload),
    /// Someone else disconnected.
    PlayerLeft(PlayerLeftPayload),
}

/// Identity handed to a freshly connected player.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfoPayload {
    /// Player identifier.
    pub player_id: PlayerId,
    /// Display name.
    pub username: String,
    /// Avatar name.
    pub character: String,
    /// Room the player was placed in.
    pub room_id: RoomId,
}

impl From<&Player> for PlayerInfoPayload {
    fn from(player: &Player) -> Self {
        Self {
            player_id: player.id,
            username: player.username.clone(),
            character: player.character.clone(),
            room_id: player.room_id,
        }
    }
}

/// Public view of a player on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    /// Player identifier.
    pub player_id: PlayerId,
    /// Display name.
    pub username: String,
    /// Avatar name.
    pub character: String,
    /// Last reported map position.
    pub position: Position,
    /// Door currently selected, if any.
    pub current_door: Option<Door>,
}

impl From<&Player> for PlayerSnapshot {
    fn from(player: &Player) -> Self {
        Self {
            player_id: player.id,
            username: player.username.clone(),
            character: player.character.clone(),
            position: player.position,
            current_door: player.current_door,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingPlayersPayload {
    /// Connected room members other than the recipient.
    pub players: Vec<PlayerSnapshot>,
}

/// Room member as listed in `roomState`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMember {
    /// Player identifier.
    pub player_id: PlayerId,
    /// Display name.
    pub username: String,
    /// Avatar name.
    pub character: String,
    /// Accumulated score.
    pub score: u32,
}

impl From<&Player> for RoomMember {
    fn from(player: &Player) -> Self {
        Self {
            player_id: player.id,
            username: player.username.clone(),
            character: player.character.clone(),
            score: player.score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStatePayload {
    /// Room identifier.
    pub room_id: RoomId,
    /// Connected members only.
    pub players: Vec<RoomMember>,
    /// Whether the room's game has started.
    pub is_game_started: bool,
    /// Members required to start.
    pub min_players: usize,
    /// Membership cap.
    pub max_players: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameCountdownPayload {
    /// Seconds before the game starts.
    pub seconds_remaining: u32,
    /// Human-readable countdown text.
    pub message: String,
}

impl GameCountdownPayload {
    /// Countdown tick with its human readable message.
    pub fn new(seconds_remaining: u32) -> Self {
        Self {
            seconds_remaining,
            message: format!("Game starting in {seconds_remaining} seconds..."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStartedPayload {
    /// Game identifier.
    pub game_id: GameId,
    /// Rounds in the game.
    pub total_rounds: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementPhasePayload {
    /// Round about to be asked.
    pub round: u32,
    /// Rounds in the game.
    pub total_rounds: u32,
    /// Window length in milliseconds.
    pub duration: Millis,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuestionPayload {
    /// Catalog identifier of the question.
    pub question_id: String,
    /// Question wording.
    pub text: String,
    /// Text behind each door.
    pub options: QuestionOptions,
    /// Round the question belongs to.
    pub round_number: u32,
    /// Rounds in the game.
    pub total_rounds: u32,
    /// Answer window in seconds.
    pub time_limit: u64,
}

/// Number of players whose avatar reached `round`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundCount {
    /// Round reached.
    pub round: u32,
    /// Players whose avatar reached it.
    pub player_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundStatsPayload {
    /// Players grouped by the round their avatar reached.
    pub players_per_round: Vec<RoundCount>,
    /// Players counted in the room.
    pub total_players: usize,
}

impl From<RoundStats> for RoundStatsPayload {
    fn from(stats: RoundStats) -> Self {
        Self {
            players_per_round: to_round_counts(stats.players_per_round),
            total_players: stats.total_players,
        }
    }
}

fn to_round_counts(per_round: BTreeMap<u32, usize>) -> Vec<RoundCount> {
    per_round
        .into_iter()
        .map(|(round, player_count)| RoundCount {
            round,
            player_count,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerCrossedDoorPayload {
    /// Player identifier.
    pub player_id: PlayerId,
    /// Display name.
    pub username: String,
    /// Rounds in which the player crossed a door.
    pub doors_crossed: u32,
    /// Round the avatar has reached.
    pub current_round: u32,
    /// Room-wide distribution of reached rounds.
    pub round_stats: RoundStatsPayload,
    /// Distinct crossers counted this round.
    pub players_crossed: usize,
    /// Crossers needed to close the round early.
    pub required_players: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayersEliminatedPayload {
    /// Players eliminated at the time limit.
    pub eliminated_players: Vec<PlayerId>,
    /// Crossers required from now on.
    pub remaining_required: usize,
}

/// Points earned by one player at a reveal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreUpdate {
    /// Player identifier.
    pub player_id: PlayerId,
    /// Display name.
    pub username: String,
    /// Points earned this round.
    pub score_gained: u32,
    /// Score after this round.
    pub total_score: u32,
    /// Whether the selected door was right.
    pub is_correct: bool,
}

/// Ranked standing of one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// Player identifier.
    pub player_id: PlayerId,
    /// Display name.
    pub username: String,
    /// Avatar name.
    pub character: String,
    /// Accumulated score.
    pub score: u32,
    /// Rounds answered correctly.
    pub correct_answers: u32,
    /// 1-based position.
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRevealedPayload {
    /// Door holding the right answer.
    pub correct_answer: Door,
    /// Why the answer is right.
    pub explanation: String,
    /// Per-player score changes.
    pub score_updates: Vec<ScoreUpdate>,
    /// Standings after scoring.
    pub leaderboard: Vec<LeaderboardEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundEndedPayload {
    /// Round that just ended.
    pub round: u32,
    /// Rounds in the game.
    pub total_rounds: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOverPayload {
    /// Standings at the end of the game.
    pub final_leaderboard: Vec<LeaderboardEntry>,
    /// Top entry, absent for an empty roster.
    pub winner: Option<LeaderboardEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerMovedPayload {
    /// Player identifier.
    pub player_id: PlayerId,
    /// Display name.
    pub username: String,
    /// Avatar name.
    pub character: String,
    /// Last reported map position.
    pub position: Position,
    /// Door the player stands in front of, if any.
    pub door: Option<Door>,
    /// Unix time in milliseconds.
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLeftPayload {
    /// Player identifier.
    pub player_id: PlayerId,
    /// Display name.
    pub username: String,
}
