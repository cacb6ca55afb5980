//! Application-level configuration loading: room capacity, phase timings and the avatar pool.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::{game::Millis, state_machine::GamePhase};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "DOOR_QUIZ_BACK_CONFIG_PATH";
/// Number of rounds played by a game when the configuration does not say otherwise.
const DEFAULT_TOTAL_ROUNDS: u32 = 20;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    total_rounds: u32,
    rooms: RoomSettings,
    timings: PhaseTimings,
    avatars: Vec<String>,
}

/// Capacity bounds and lifecycle knobs applied to every room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RoomSettings {
    /// Members required before a game may start.
    pub min_players: usize,
    /// Hard cap on room membership; a full room starts immediately.
    pub max_players: usize,
    /// Age after which an empty room is reclaimed.
    pub empty_room_ttl_secs: u64,
    /// Period of the background sweep reclaiming empty rooms.
    pub cleanup_interval_secs: u64,
    /// Length of the countdown broadcast before an auto-start.
    pub start_countdown_secs: u32,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            min_players: 1,
            max_players: 10,
            empty_room_ttl_secs: 60 * 60,
            cleanup_interval_secs: 60,
            start_countdown_secs: 10,
        }
    }
}

impl RoomSettings {
    /// Age after which an empty room is reclaimed.
    pub fn empty_room_ttl(&self) -> Duration {
        Duration::from_secs(self.empty_room_ttl_secs)
    }

    /// Period of the empty room sweep.
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }
}

/// Fixed duration of every timed phase, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PhaseTimings {
    /// Time players get to reposition before the question shows up.
    pub movement_ms: Millis,
    /// Answer window; also the horizon over which the speed bonus decays.
    pub question_ms: Millis,
    /// How long the correct answer and scores stay on screen.
    pub answer_review_ms: Millis,
    /// Pause between two rounds.
    pub round_end_ms: Millis,
    /// Grace window during which a finished game is still visible to stats queries.
    pub game_retire_ms: Millis,
}

impl Default for PhaseTimings {
    fn default() -> Self {
        Self {
            movement_ms: 3_000,
            question_ms: 15_000,
            answer_review_ms: 5_000,
            round_end_ms: 2_000,
            game_retire_ms: 30_000,
        }
    }
}

impl PhaseTimings {
    /// Duration of the timer armed when entering `phase`.
    ///
    /// `Waiting` has no timer: the game leaves it through an explicit start.
    pub fn for_phase(&self, phase: GamePhase) -> Option<Millis> {
        match phase {
            GamePhase::Waiting => None,
            GamePhase::Movement => Some(self.movement_ms),
            GamePhase::QuestionActive => Some(self.question_ms),
            GamePhase::AnswerReview => Some(self.answer_review_ms),
            GamePhase::RoundEnd => Some(self.round_end_ms),
            GamePhase::GameOver => Some(self.game_retire_ms),
        }
    }
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        total_rounds = app_config.total_rounds,
                        max_players = app_config.rooms.max_players,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Number of rounds every game plays.
    pub fn total_rounds(&self) -> u32 {
        self.total_rounds
    }

    /// Capacity bounds and lifecycle settings for rooms.
    pub fn rooms(&self) -> RoomSettings {
        self.rooms
    }

    /// Phase durations used by the session orchestrator.
    pub fn timings(&self) -> PhaseTimings {
        self.timings
    }

    /// Named characters handed out to new players.
    pub fn avatars(&self) -> &[String] {
        &self.avatars
    }

    /// Override the room settings, keeping the capacity bounds consistent.
    pub fn with_rooms(mut self, rooms: RoomSettings) -> Self {
        self.rooms = sanitize_rooms(rooms);
        self
    }

    /// Override the phase timings.
    pub fn with_timings(mut self, timings: PhaseTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Override the number of rounds (at least one).
    pub fn with_total_rounds(mut self, total_rounds: u32) -> Self {
        self.total_rounds = total_rounds.max(1);
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            total_rounds: DEFAULT_TOTAL_ROUNDS,
            rooms: RoomSettings::default(),
            timings: PhaseTimings::default(),
            avatars: default_avatars(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    total_rounds: Option<u32>,
    #[serde(default)]
    rooms: RoomSettings,
    #[serde(default)]
    timings: PhaseTimings,
    #[serde(default)]
    avatars: Vec<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let avatars = value
            .avatars
            .into_iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>();

        Self {
            total_rounds: value.total_rounds.unwrap_or(DEFAULT_TOTAL_ROUNDS).max(1),
            rooms: sanitize_rooms(value.rooms),
            timings: value.timings,
            avatars: if avatars.is_empty() {
                default_avatars()
            } else {
                avatars
            },
        }
    }
}

fn sanitize_rooms(mut rooms: RoomSettings) -> RoomSettings {
    rooms.min_players = rooms.min_players.max(1);
    rooms.max_players = rooms.max_players.max(rooms.min_players);
    rooms
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in avatar pool shipped with the binary.
fn default_avatars() -> Vec<String> {
    [
        "Aladdin",
        "Sinbad",
        "Scheherazade",
        "Ali Baba",
        "Morgiana",
        "Genie",
        "Sultan",
        "Princess",
        "Merchant",
        "Sailor",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
