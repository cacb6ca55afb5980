use std::{collections::HashSet, fmt};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::state_machine::GamePhase;

/// Identifier of a player, stable for the lifetime of the process.
pub type PlayerId = Uuid;
/// Identifier of a room.
pub type RoomId = Uuid;
/// Identifier of a running game.
pub type GameId = Uuid;
/// Identifier of a transport connection (one WebSocket).
pub type ConnectionId = Uuid;
/// Millisecond timestamp read from a [`crate::state::clock::Clock`].
pub type Millis = u64;

/// One of the four labelled answer slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Door {
    /// First option.
    A,
    /// Second option.
    B,
    /// Third option.
    C,
    /// Fourth option.
    D,
}

impl fmt::Display for Door {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Door::A => "A",
            Door::B => "B",
            Door::C => "C",
            Door::D => "D",
        };
        f.write_str(label)
    }
}

/// Difficulty tag attached to catalog questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    /// Warm-up material.
    Easy,
    /// Needs some knowledge of the tales.
    Medium,
    /// For connoisseurs.
    Hard,
}

/// Text shown behind each door.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub struct QuestionOptions {
    /// Option behind door A.
    pub a: String,
    /// Option behind door B.
    pub b: String,
    /// Option behind door C.
    pub c: String,
    /// Option behind door D.
    pub d: String,
}

/// Quiz item drawn from the question source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Catalog identifier.
    pub id: String,
    /// Question wording.
    pub text: String,
    /// Four answer options.
    pub options: QuestionOptions,
    /// Door holding the right answer.
    pub correct: Door,
    /// Explanation revealed after the answer window.
    pub explanation: String,
    /// Difficulty tag.
    pub difficulty: Difficulty,
    /// Tale or theme the question belongs to.
    pub theme: String,
}

/// Map coordinates reported by the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

/// The single pending deadline of a game.
///
/// Arming a new timer bumps the generation; an elapsed notification carrying an older
/// generation belongs to a cancelled timer and is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTimer {
    /// Monotonic counter identifying this arming.
    pub generation: u64,
    /// Timestamp at which the timer elapses.
    pub fires_at: Millis,
}

/// Round-based state of one game running inside a started room.
#[derive(Debug, Clone)]
pub struct GameState {
    /// Primary key of the game.
    pub id: GameId,
    /// Room hosting the game.
    pub room_id: RoomId,
    /// 1-based round counter, 0 while waiting.
    pub current_round: u32,
    /// Number of rounds to play.
    pub total_rounds: u32,
    /// Current phase of the round cycle.
    pub phase: GamePhase,
    /// Question of the running round, withheld outside QUESTION_ACTIVE/ANSWER_REVIEW.
    pub current_question: Option<Question>,
    /// Players who selected a door this round.
    pub players_answered: HashSet<PlayerId>,
    /// Players who crossed a door this round, in arrival order.
    pub players_crossed: IndexSet<PlayerId>,
    /// Players present when the game was created, in arrival order.
    pub roster: Vec<PlayerId>,
    /// Roster members eliminated in a previous round.
    pub eliminated: HashSet<PlayerId>,
    /// Crossings needed before a round may close early.
    pub required_players_for_next_round: usize,
    /// Timestamp at which the current question was shown.
    pub round_started_at: Option<Millis>,
    /// Set once the game reached its terminal phase.
    pub is_game_over: bool,
    /// Creation timestamp.
    pub created_at: Millis,
    /// Single pending phase timer.
    pub timer: Option<PhaseTimer>,
    timer_generation: u64,
}

impl GameState {
    /// Create a waiting game for `roster`, requiring every roster member to cross.
    pub fn new(room_id: RoomId, roster: Vec<PlayerId>, total_rounds: u32, now: Millis) -> Self {
        let required = roster.len().max(1);
        Self {
            id: Uuid::new_v4(),
            room_id,
            current_round: 0,
            total_rounds: total_rounds.max(1),
            phase: GamePhase::Waiting,
            current_question: None,
            players_answered: HashSet::new(),
            players_crossed: IndexSet::new(),
            roster,
            eliminated: HashSet::new(),
            required_players_for_next_round: required,
            round_started_at: None,
            is_game_over: false,
            created_at: now,
            timer: None,
            timer_generation: 0,
        }
    }

    /// Arm the phase timer, replacing any pending one. Returns the new generation.
    pub fn arm_timer(&mut self, fires_at: Millis) -> u64 {
        self.timer_generation += 1;
        self.timer = Some(PhaseTimer {
            generation: self.timer_generation,
            fires_at,
        });
        self.timer_generation
    }

    /// Cancel the pending timer, if any.
    pub fn cancel_timer(&mut self) {
        self.timer = None;
    }

    /// Whether `generation` identifies the timer currently pending.
    pub fn is_current_timer(&self, generation: u64) -> bool {
        self.timer.is_some_and(|timer| timer.generation == generation)
    }

    /// Roster members that have not been eliminated yet, in arrival order.
    pub fn active_roster(&self) -> impl Iterator<Item = &PlayerId> {
        self.roster
            .iter()
            .filter(|id| !self.eliminated.contains(*id))
    }

    /// Whether `player_id` still counts towards the required crossers.
    pub fn is_active(&self, player_id: &PlayerId) -> bool {
        self.roster.contains(player_id) && !self.eliminated.contains(player_id)
    }

    /// True once enough distinct players crossed to close the round early.
    pub fn can_proceed_to_next_round(&self) -> bool {
        self.players_crossed.len() >= self.required_players_for_next_round
    }

    /// Reset the per-round tracking sets.
    pub fn clear_round_tracking(&mut self) {
        self.players_answered.clear();
        self.players_crossed.clear();
    }
}
