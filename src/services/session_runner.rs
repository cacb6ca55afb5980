//! Per-room task driving a [`Session`].
//!
//! Each started room gets one task that owns the game state. Player intents reach it
//! through an unbounded mailbox and the pending phase deadline is awaited alongside, so
//! every mutation of a game happens on a single task.

use tokio::{
    sync::{mpsc, watch},
    time::sleep_until,
};
use tracing::{debug, info};

use crate::{
    dto::ws::ServerMessage,
    services::{
        orchestrator::{GameSnapshot, Session, SessionInput},
        room_events,
    },
    state::{
        SharedState,
        clock::Clock,
        game::{GameId, PlayerId, RoomId},
    },
};

/// Player intent forwarded to a running game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// The player stood in front of a door during the answer window.
    SelectDoor(PlayerId),
    /// The player walked through a door.
    CrossDoor(PlayerId),
}

impl From<SessionCommand> for SessionInput {
    fn from(command: SessionCommand) -> Self {
        match command {
            SessionCommand::SelectDoor(player_id) => SessionInput::DoorSelected { player_id },
            SessionCommand::CrossDoor(player_id) => SessionInput::DoorCrossed { player_id },
        }
    }
}

/// Mailbox and status of a running game.
#[derive(Clone)]
pub struct SessionHandle {
    game_id: GameId,
    commands: mpsc::UnboundedSender<SessionCommand>,
    snapshot: watch::Receiver<GameSnapshot>,
}

impl SessionHandle {
    /// Game driven by this session.
    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    /// Queue a command; false when the session already stopped.
    pub fn send(&self, command: SessionCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    /// Latest published state of the game.
    pub fn snapshot(&self) -> GameSnapshot {
        self.snapshot.borrow().clone()
    }
}

/// Spawn the task driving `session` and start its game.
pub fn spawn(state: &SharedState, session: Session) -> SessionHandle {
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshot_rx) = watch::channel(session.snapshot());
    let handle = SessionHandle {
        game_id: session.game().id,
        commands: commands_tx,
        snapshot: snapshot_rx,
    };

    tokio::spawn(run(state.clone(), session, commands_rx, snapshot_tx));
    handle
}

async fn run(
    state: SharedState,
    mut session: Session,
    mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    snapshot: watch::Sender<GameSnapshot>,
) {
    let clock = *state.clock();
    let room_id = session.game().room_id;
    let game_id = session.game().id;
    info!(game_id = %game_id, room_id = %room_id, "session started");

    let mut input = Some(SessionInput::Start);
    while let Some(next) = input.take() {
        let messages = session.handle(next, clock.now());
        dispatch(&state, &room_id, &messages);
        snapshot.send_replace(session.snapshot());

        if session.is_retired() {
            retire(&state, &session);
            return;
        }

        input = match session.game().timer {
            Some(timer) => tokio::select! {
                command = commands.recv() => command.map(SessionInput::from),
                () = sleep_until(clock.instant_at(timer.fires_at)) => {
                    Some(SessionInput::TimerElapsed { generation: timer.generation })
                }
            },
            None => commands.recv().await.map(SessionInput::from),
        };
    }

    debug!(game_id = %game_id, room_id = %room_id, "session mailbox closed");
}

fn dispatch(state: &SharedState, room_id: &RoomId, messages: &[ServerMessage]) {
    for message in messages {
        room_events::broadcast_to_room(state, room_id, message);
    }
}

/// Drop the session handle; player records outlive the game.
fn retire(state: &SharedState, session: &Session) {
    let game = session.game();
    state
        .sessions()
        .remove_if(&game.room_id, |_, handle| handle.game_id() == game.id);
    info!(game_id = %game.id, room_id = %game.room_id, "session stopped");
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use axum::extract::ws::Message;
    use uuid::Uuid;

    use super::*;
    use crate::{
        config::{AppConfig, PhaseTimings},
        dao::question_bank::QuestionBank,
        state::{AppState, ClientConnection, game::GameState, state_machine::GamePhase},
    };

    fn fast_state(total_rounds: u32) -> SharedState {
        let config = AppConfig::default()
            .with_total_rounds(total_rounds)
            .with_timings(PhaseTimings {
                movement_ms: 100,
                question_ms: 200,
                answer_review_ms: 100,
                round_end_ms: 100,
                game_retire_ms: 100,
            });
        AppState::new(config, Arc::new(QuestionBank::builtin().unwrap()))
    }

    /// Register one connected player in a fresh room, returning its id and socket feed.
    fn join(state: &SharedState) -> (RoomId, PlayerId, mpsc::UnboundedReceiver<Message>) {
        let room = state.rooms().create_room();
        let connection_id = Uuid::new_v4();
        let player = state.players().create_player(connection_id, room.id);
        state.rooms().add_player_to_room(&room.id, player.id);

        let (tx, rx) = mpsc::unbounded_channel();
        state.connections().insert(
            connection_id,
            ClientConnection {
                player_id: player.id,
                room_id: room.id,
                tx,
            },
        );
        (room.id, player.id, rx)
    }

    fn start(state: &SharedState, room_id: RoomId, roster: Vec<PlayerId>) -> SessionHandle {
        let config = state.config();
        state.rooms().start_game(&room_id);
        let game = GameState::new(room_id, roster, config.total_rounds(), state.clock().now());
        let session = Session::new(
            game,
            state.players().clone(),
            state.questions().clone(),
            config.timings(),
        );
        let handle = spawn(state, session);
        state.sessions().insert(room_id, handle.clone());
        handle
    }

    fn drain_events(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<String> {
        let mut events = Vec::new();
        while let Ok(Message::Text(text)) = rx.try_recv() {
            let value = serde_json::from_str::<serde_json::Value>(text.as_str()).unwrap();
            events.push(value["event"].as_str().unwrap().to_string());
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn timers_drive_a_game_to_retirement() {
        let state = fast_state(1);
        let (room_id, player_id, mut rx) = join(&state);
        start(&state, room_id, vec![player_id]);

        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(
            drain_events(&mut rx),
            vec![
                "movementPhase",
                "newQuestion",
                "playersEliminated",
                "answerRevealed",
                "roundEnded",
                "gameOver",
            ]
        );
        assert!(state.sessions().get(&room_id).is_none());
        assert!(state.players().get(&player_id).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn crossing_closes_the_answer_window_early() {
        let state = fast_state(2);
        let (room_id, player_id, mut rx) = join(&state);
        let handle = start(&state, room_id, vec![player_id]);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(handle.snapshot().phase, GamePhase::QuestionActive);

        assert!(handle.send(SessionCommand::CrossDoor(player_id)));
        tokio::time::sleep(Duration::from_millis(10)).await;

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.phase, GamePhase::AnswerReview);
        assert_eq!(snapshot.required_players, 1);
        assert_eq!(
            drain_events(&mut rx),
            vec!["movementPhase", "newQuestion", "playerCrossedDoor", "answerRevealed"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn retirement_keeps_disconnected_players() {
        let state = fast_state(1);
        let (room_id, player_id, _rx) = join(&state);
        let connection_id = state.players().get(&player_id).unwrap().connection_id;
        start(&state, room_id, vec![player_id]);

        state.players().disconnect_player(&connection_id);
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(state.sessions().get(&room_id).is_none());
        assert!(
            state
                .players()
                .get(&player_id)
                .is_some_and(|player| !player.is_connected)
        );
        assert!(
            state
                .rooms()
                .get(&room_id)
                .is_some_and(|room| room.player_ids == vec![player_id])
        );
    }
}
