/// Time source for deadlines.
pub mod clock;
/// Game state and shared domain types.
pub mod game;
/// Player registry.
pub mod player;
/// Room registry.
pub mod room;
/// Phase transitions.
pub mod state_machine;

use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinHandle,
};

use crate::{
    config::AppConfig,
    dao::question_bank::QuestionSource,
    services::session_runner::SessionHandle,
    state::{
        clock::MonotonicClock,
        game::{ConnectionId, PlayerId, RoomId},
        player::PlayerRegistry,
        room::RoomRegistry,
    },
};

/// Application state shared across handlers and tasks.
pub type SharedState = Arc<AppState>;

#[derive(Clone)]
/// Handle used to push messages to a connected game client.
pub struct ClientConnection {
    /// Player carried by the socket.
    pub player_id: PlayerId,
    /// Room of that player.
    pub room_id: RoomId,
    /// Writer channel of the socket.
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Central application state: registries, live sockets and running games.
pub struct AppState {
    config: Arc<AppConfig>,
    clock: MonotonicClock,
    players: Arc<PlayerRegistry>,
    rooms: RoomRegistry,
    questions: Arc<dyn QuestionSource>,
    connections: DashMap<ConnectionId, ClientConnection>,
    sessions: DashMap<RoomId, SessionHandle>,
    countdowns: DashMap<RoomId, JoinHandle<()>>,
    admission_gate: Mutex<()>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig, questions: Arc<dyn QuestionSource>) -> SharedState {
        Arc::new(Self {
            players: Arc::new(PlayerRegistry::new(config.avatars())),
            rooms: RoomRegistry::new(config.rooms()),
            config: Arc::new(config),
            clock: MonotonicClock::new(),
            questions,
            connections: DashMap::new(),
            sessions: DashMap::new(),
            countdowns: DashMap::new(),
            admission_gate: Mutex::new(()),
        })
    }

    /// Access the shared application configuration.
    pub fn config(&self) -> Arc<AppConfig> {
        self.config.clone()
    }

    /// Time source for deadlines and answer timestamps.
    pub fn clock(&self) -> &MonotonicClock {
        &self.clock
    }

    /// Every player known to the process.
    pub fn players(&self) -> &Arc<PlayerRegistry> {
        &self.players
    }

    /// Every room known to the process.
    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    /// Catalog games draw their questions from.
    pub fn questions(&self) -> &Arc<dyn QuestionSource> {
        &self.questions
    }

    /// Live sockets keyed by connection identifier.
    pub fn connections(&self) -> &DashMap<ConnectionId, ClientConnection> {
        &self.connections
    }

    /// Running games keyed by the room hosting them.
    pub fn sessions(&self) -> &DashMap<RoomId, SessionHandle> {
        &self.sessions
    }

    /// Pending start countdowns keyed by room.
    pub fn countdowns(&self) -> &DashMap<RoomId, JoinHandle<()>> {
        &self.countdowns
    }

    /// Serialises room admission with game starts, so a starting room never gains members.
    pub fn admission_gate(&self) -> &Mutex<()> {
        &self.admission_gate
    }
}
