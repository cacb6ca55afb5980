//! Round loop of a single game.
//!
//! [`Session`] owns one [`GameState`] and reacts to player intents and timer expiries,
//! returning the events to broadcast to the room. It never sleeps nor reads a clock: the
//! caller passes `now` and is responsible for waking it up when `game().timer` elapses.

use std::{collections::HashSet, sync::Arc};

use tracing::{debug, info, warn};

use crate::{
    config::PhaseTimings,
    dao::question_bank::QuestionSource,
    dto::ws::{
        AnswerRevealedPayload, GameOverPayload, MovementPhasePayload, NewQuestionPayload,
        PlayerCrossedDoorPayload, PlayersEliminatedPayload, RoundEndedPayload, ServerMessage,
    },
    services::scoring,
    state::{
        game::{GameId, GameState, Millis, PlayerId, Question, RoomId},
        player::PlayerRegistry,
        state_machine::{CloseReason, FinishReason, GamePhase, PhaseEvent, next_phase},
    },
};

/// Something that happened to a running game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionInput {
    /// Leave the waiting phase and open the first round.
    Start,
    /// The phase timer armed with `generation` elapsed.
    TimerElapsed {
        /// Generation of the elapsed timer.
        generation: u64,
    },
    /// A player stood in front of a door.
    DoorSelected {
        /// Player who selected a door.
        player_id: PlayerId,
    },
    /// A player walked through a door.
    DoorCrossed {
        /// Player who crossed.
        player_id: PlayerId,
    },
}

/// Read-only summary of a game, published for the stats surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSnapshot {
    /// Game identifier.
    pub game_id: GameId,
    /// Room hosting the game.
    pub room_id: RoomId,
    /// Round in progress, 0 before the first one.
    pub current_round: u32,
    /// Rounds in the game.
    pub total_rounds: u32,
    /// Current phase.
    pub phase: GamePhase,
    /// Players in the roster.
    pub player_count: usize,
    /// Crossers needed to close a round early.
    pub required_players: usize,
    /// Set once the game reached its last phase.
    pub is_game_over: bool,
}

/// Game state plus the collaborators needed to advance it.
pub struct Session {
    game: GameState,
    players: Arc<PlayerRegistry>,
    questions: Arc<dyn QuestionSource>,
    timings: PhaseTimings,
    asked: HashSet<String>,
    retired: bool,
}

impl Session {
    /// Wrap a freshly created game.
    pub fn new(
        game: GameState,
        players: Arc<PlayerRegistry>,
        questions: Arc<dyn QuestionSource>,
        timings: PhaseTimings,
    ) -> Self {
        Self {
            game,
            players,
            questions,
            timings,
            asked: HashSet::new(),
            retired: false,
        }
    }

    /// Current game state.
    pub fn game(&self) -> &GameState {
        &self.game
    }

    /// True once the grace window after game over elapsed.
    pub fn is_retired(&self) -> bool {
        self.retired
    }

    /// Summary of the current state.
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            game_id: self.game.id,
            room_id: self.game.room_id,
            current_round: self.game.current_round,
            total_rounds: self.game.total_rounds,
            phase: self.game.phase,
            player_count: self.game.roster.len(),
            required_players: self.game.required_players_for_next_round,
            is_game_over: self.game.is_game_over,
        }
    }

    /// Apply `input` at time `now`, returning the events to broadcast in order.
    ///
    /// Inputs that do not apply to the current phase are ignored.
    pub fn handle(&mut self, input: SessionInput, now: Millis) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        if self.retired {
            return out;
        }

        match input {
            SessionInput::Start => self.transition(PhaseEvent::Start, now, &mut out),
            SessionInput::TimerElapsed { generation } => {
                self.on_timer(generation, now, &mut out)
            }
            SessionInput::DoorSelected { player_id } => self.on_door_selected(player_id, now),
            SessionInput::DoorCrossed { player_id } => {
                self.on_door_crossed(player_id, now, &mut out)
            }
        }
        out
    }

    fn on_timer(&mut self, generation: u64, now: Millis, out: &mut Vec<ServerMessage>) {
        if !self.game.is_current_timer(generation) {
            debug!(game_id = %self.game.id, generation, "stale timer ignored");
            return;
        }
        self.game.cancel_timer();

        match self.game.phase {
            GamePhase::Waiting => {}
            GamePhase::Movement => self.close_movement(now, out),
            GamePhase::QuestionActive => self.close_on_time_limit(now, out),
            GamePhase::AnswerReview => self.transition(PhaseEvent::ReviewElapsed, now, out),
            GamePhase::RoundEnd => {
                let event = if self.game.current_round >= self.game.total_rounds {
                    PhaseEvent::Finish(FinishReason::AllRoundsPlayed)
                } else {
                    PhaseEvent::NextRound
                };
                self.transition(event, now, out);
            }
            GamePhase::GameOver => {
                self.retired = true;
                info!(game_id = %self.game.id, room_id = %self.game.room_id, "game retired");
            }
        }
    }

    fn close_movement(&mut self, now: Millis, out: &mut Vec<ServerMessage>) {
        match self.draw_question() {
            Some(question) => {
                self.game.current_question = Some(question);
                self.transition(PhaseEvent::QuestionDrawn, now, out);
            }
            None => {
                warn!(game_id = %self.game.id, "question source exhausted; ending game");
                self.transition(
                    PhaseEvent::Finish(FinishReason::QuestionsExhausted),
                    now,
                    out,
                );
            }
        }
    }

    /// Pick a question not asked yet in this game, falling back to a repeat.
    fn draw_question(&mut self) -> Option<Question> {
        let candidates = self.questions.draw(self.questions.len());
        let question = candidates
            .iter()
            .find(|question| !self.asked.contains(&question.id))
            .or_else(|| candidates.first())
            .cloned()?;
        self.asked.insert(question.id.clone());
        Some(question)
    }

    fn on_door_selected(&mut self, player_id: PlayerId, now: Millis) {
        if self.game.phase != GamePhase::QuestionActive || !self.game.roster.contains(&player_id)
        {
            return;
        }
        self.players.record_answer_time(&player_id, now);
        self.game.players_answered.insert(player_id);
    }

    fn on_door_crossed(&mut self, player_id: PlayerId, now: Millis, out: &mut Vec<ServerMessage>) {
        if self.game.phase != GamePhase::QuestionActive {
            debug!(game_id = %self.game.id, player_id = %player_id, "crossing outside answer window ignored");
            return;
        }
        if !self.game.is_active(&player_id) || self.game.players_crossed.contains(&player_id) {
            return;
        }
        let Some(player) = self.players.record_door_crossing(&player_id) else {
            return;
        };
        self.game.players_crossed.insert(player_id);

        out.push(ServerMessage::PlayerCrossedDoor(PlayerCrossedDoorPayload {
            player_id,
            username: player.username,
            doors_crossed: player.doors_crossed,
            current_round: player.current_round,
            round_stats: self.players.round_stats(&self.game.room_id).into(),
            players_crossed: self.game.players_crossed.len(),
            required_players: self.game.required_players_for_next_round,
        }));

        if self.game.can_proceed_to_next_round() {
            self.game.cancel_timer();
            self.game.required_players_for_next_round =
                self.game.required_players_for_next_round.saturating_sub(1).max(1);
            self.game.players_crossed.clear();
            info!(
                game_id = %self.game.id,
                round = self.game.current_round,
                required = self.game.required_players_for_next_round,
                "enough players crossed; closing answer window"
            );
            self.transition(
                PhaseEvent::QuestionClosed(CloseReason::EnoughCrossed),
                now,
                out,
            );
        }
    }

    fn close_on_time_limit(&mut self, now: Millis, out: &mut Vec<ServerMessage>) {
        let eliminated = self
            .game
            .active_roster()
            .filter(|id| !self.game.players_crossed.contains(*id))
            .copied()
            .collect::<Vec<_>>();

        self.game.eliminated.extend(eliminated.iter().copied());
        self.game.required_players_for_next_round = self
            .game
            .required_players_for_next_round
            .saturating_sub(eliminated.len())
            .max(1);

        if !eliminated.is_empty() {
            info!(
                game_id = %self.game.id,
                round = self.game.current_round,
                eliminated = eliminated.len(),
                required = self.game.required_players_for_next_round,
                "players eliminated"
            );
            out.push(ServerMessage::PlayersEliminated(PlayersEliminatedPayload {
                eliminated_players: eliminated,
                remaining_required: self.game.required_players_for_next_round,
            }));
        }

        self.transition(PhaseEvent::QuestionClosed(CloseReason::TimeLimit), now, out);
    }

    fn transition(&mut self, event: PhaseEvent, now: Millis, out: &mut Vec<ServerMessage>) {
        let next = match next_phase(self.game.phase, event) {
            Ok(next) => next,
            Err(err) => {
                debug!(game_id = %self.game.id, error = %err, "phase event skipped");
                return;
            }
        };

        debug!(game_id = %self.game.id, from = ?self.game.phase, to = ?next, "phase transition");
        self.game.phase = next;

        match next {
            GamePhase::Waiting => {}
            GamePhase::Movement => self.enter_movement(out),
            GamePhase::QuestionActive => self.enter_question(now, out),
            GamePhase::AnswerReview => self.enter_answer_review(now, out),
            GamePhase::RoundEnd => self.enter_round_end(out),
            GamePhase::GameOver => self.enter_game_over(out),
        }

        if let Some(duration) = self.timings.for_phase(next) {
            self.game.arm_timer(now.saturating_add(duration));
        }
    }

    fn enter_movement(&mut self, out: &mut Vec<ServerMessage>) {
        self.game.current_round += 1;
        self.game.current_question = None;
        self.game.round_started_at = None;

        out.push(ServerMessage::MovementPhase(MovementPhasePayload {
            round: self.game.current_round,
            total_rounds: self.game.total_rounds,
            duration: self.timings.movement_ms,
        }));
    }

    fn enter_question(&mut self, now: Millis, out: &mut Vec<ServerMessage>) {
        self.game.round_started_at = Some(now);
        self.game.clear_round_tracking();
        for player_id in &self.game.roster {
            self.players.reset_round_answer(player_id);
        }

        if let Some(question) = &self.game.current_question {
            out.push(ServerMessage::NewQuestion(NewQuestionPayload {
                question_id: question.id.clone(),
                text: question.text.clone(),
                options: question.options.clone(),
                round_number: self.game.current_round,
                total_rounds: self.game.total_rounds,
                time_limit: self.timings.question_ms / 1000,
            }));
        }
    }

    fn enter_answer_review(&mut self, now: Millis, out: &mut Vec<ServerMessage>) {
        let Some(question) = &self.game.current_question else {
            warn!(game_id = %self.game.id, "answer review without a question");
            return;
        };

        let roster = self.players.players_by_ids(&self.game.roster);
        let updates = scoring::generate_score_updates(
            &roster,
            question.correct,
            self.game.round_started_at.unwrap_or(now),
            now,
            self.timings.question_ms,
        );
        for update in &updates {
            self.players
                .update_player_score(&update.player_id, update.score_gained, update.is_correct);
        }

        let leaderboard =
            scoring::generate_leaderboard(&self.players.players_by_ids(&self.game.roster));

        out.push(ServerMessage::AnswerRevealed(AnswerRevealedPayload {
            correct_answer: question.correct,
            explanation: question.explanation.clone(),
            score_updates: updates,
            leaderboard,
        }));
    }

    fn enter_round_end(&mut self, out: &mut Vec<ServerMessage>) {
        out.push(ServerMessage::RoundEnded(RoundEndedPayload {
            round: self.game.current_round,
            total_rounds: self.game.total_rounds,
        }));
    }

    fn enter_game_over(&mut self, out: &mut Vec<ServerMessage>) {
        self.game.is_game_over = true;
        self.game.current_question = None;

        let final_leaderboard =
            scoring::generate_leaderboard(&self.players.players_by_ids(&self.game.roster));
        let winner = scoring::winner(&final_leaderboard).cloned();

        info!(
            game_id = %self.game.id,
            room_id = %self.game.room_id,
            winner = ?winner.as_ref().map(|entry| entry.username.as_str()),
            "game over"
        );

        out.push(ServerMessage::GameOver(GameOverPayload {
            final_leaderboard,
            winner,
        }));
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::{
        dao::question_bank::QuestionBank,
        dto::ws::LeaderboardEntry,
        state::game::{Difficulty, Door, Position, QuestionOptions},
    };

    struct NoQuestions;

    impl QuestionSource for NoQuestions {
        fn draw(&self, _count: usize) -> Vec<Question> {
            Vec::new()
        }

        fn len(&self) -> usize {
            0
        }
    }

    fn question(id: &str, correct: Door) -> Question {
        Question {
            id: id.to_string(),
            text: "Which door?".to_string(),
            options: QuestionOptions {
                a: "a".to_string(),
                b: "b".to_string(),
                c: "c".to_string(),
                d: "d".to_string(),
            },
            correct,
            explanation: "Because.".to_string(),
            difficulty: Difficulty::Easy,
            theme: "Test".to_string(),
        }
    }

    struct Fixture {
        session: Session,
        players: Arc<PlayerRegistry>,
        roster: Vec<PlayerId>,
    }

    fn fixture(player_count: usize, total_rounds: u32) -> Fixture {
        let bank = QuestionBank::from_questions(vec![question("q1", Door::B)]).unwrap();
        fixture_with(player_count, total_rounds, Arc::new(bank))
    }

    fn fixture_with(
        player_count: usize,
        total_rounds: u32,
        questions: Arc<dyn QuestionSource>,
    ) -> Fixture {
        let players = Arc::new(PlayerRegistry::new(&["Genie".to_string()]));
        let room_id = Uuid::new_v4();
        let roster = (0..player_count)
            .map(|_| players.create_player(Uuid::new_v4(), room_id).id)
            .collect::<Vec<_>>();
        let game = GameState::new(room_id, roster.clone(), total_rounds, 0);
        let session = Session::new(game, players.clone(), questions, PhaseTimings::default());

        Fixture {
            session,
            players,
            roster,
        }
    }

    /// Fire the pending timer at its deadline.
    fn fire(session: &mut Session) -> (Vec<ServerMessage>, Millis) {
        let timer = session.game().timer.expect("a timer is pending");
        let out = session.handle(
            SessionInput::TimerElapsed {
                generation: timer.generation,
            },
            timer.fires_at,
        );
        (out, timer.fires_at)
    }

    /// Start the game and open the first answer window.
    fn open_question(fx: &mut Fixture) -> Millis {
        fx.session.handle(SessionInput::Start, 0);
        let (out, now) = fire(&mut fx.session);
        assert!(matches!(out.as_slice(), [ServerMessage::NewQuestion(_)]));
        now
    }

    fn select(fx: &mut Fixture, player_id: PlayerId, door: Door, now: Millis) {
        fx.players
            .update_player_position(&player_id, Position::default(), Some(door));
        fx.session
            .handle(SessionInput::DoorSelected { player_id }, now);
    }

    fn cross(fx: &mut Fixture, player_id: PlayerId, now: Millis) -> Vec<ServerMessage> {
        fx.session.handle(SessionInput::DoorCrossed { player_id }, now)
    }

    fn leaderboard_ids(entries: &[LeaderboardEntry]) -> Vec<PlayerId> {
        entries.iter().map(|entry| entry.player_id).collect()
    }

    #[test]
    fn start_opens_round_one_movement() {
        let mut fx = fixture(2, 20);

        let out = fx.session.handle(SessionInput::Start, 0);

        assert_eq!(
            out,
            vec![ServerMessage::MovementPhase(MovementPhasePayload {
                round: 1,
                total_rounds: 20,
                duration: 3_000,
            })]
        );
        assert_eq!(fx.session.game().phase, GamePhase::Movement);
        assert_eq!(fx.session.game().timer.map(|t| t.fires_at), Some(3_000));
        assert!(fx.session.handle(SessionInput::Start, 10).is_empty());
    }

    #[test]
    fn question_is_sent_without_the_answer() {
        let mut fx = fixture(2, 20);
        fx.session.handle(SessionInput::Start, 0);

        let (out, now) = fire(&mut fx.session);

        let [ServerMessage::NewQuestion(payload)] = out.as_slice() else {
            panic!("expected a question, got {out:?}");
        };
        assert_eq!(payload.question_id, "q1");
        assert_eq!(payload.round_number, 1);
        assert_eq!(payload.time_limit, 15);
        let json = serde_json::to_string(&out[0]).unwrap();
        assert!(!json.contains("correct"));
        assert_eq!(fx.session.game().round_started_at, Some(now));
        assert_eq!(fx.session.game().phase, GamePhase::QuestionActive);
    }

    #[test]
    fn everyone_crossing_the_right_door_advances_early() {
        let mut fx = fixture(4, 20);
        let start = open_question(&mut fx);
        assert_eq!(fx.session.game().required_players_for_next_round, 4);

        let roster = fx.roster.clone();
        for id in &roster {
            select(&mut fx, *id, Door::B, start + 500);
        }
        for id in &roster[..3] {
            let out = cross(&mut fx, *id, start + 800);
            assert!(matches!(out.as_slice(), [ServerMessage::PlayerCrossedDoor(_)]));
        }
        let out = cross(&mut fx, roster[3], start + 900);

        let [
            ServerMessage::PlayerCrossedDoor(crossed),
            ServerMessage::AnswerRevealed(reveal),
        ] = out.as_slice()
        else {
            panic!("expected crossing then reveal, got {out:?}");
        };
        assert_eq!(crossed.players_crossed, 4);
        assert_eq!(reveal.correct_answer, Door::B);
        assert!(reveal.score_updates.iter().all(|u| u.score_gained >= 100));
        assert_eq!(reveal.leaderboard.len(), 4);

        let game = fx.session.game();
        assert_eq!(game.phase, GamePhase::AnswerReview);
        assert_eq!(game.required_players_for_next_round, 3);
        assert!(game.eliminated.is_empty());
    }

    #[test]
    fn time_limit_eliminates_players_who_did_not_cross() {
        let mut fx = fixture(4, 20);
        let start = open_question(&mut fx);
        let roster = fx.roster.clone();

        cross(&mut fx, roster[0], start + 1_000);
        cross(&mut fx, roster[2], start + 2_000);
        let (out, _) = fire(&mut fx.session);

        let ServerMessage::PlayersEliminated(eliminated) = &out[0] else {
            panic!("expected eliminations first, got {out:?}");
        };
        assert_eq!(eliminated.eliminated_players, vec![roster[1], roster[3]]);
        assert_eq!(eliminated.remaining_required, 2);
        assert!(matches!(out[1], ServerMessage::AnswerRevealed(_)));

        let game = fx.session.game();
        assert_eq!(game.required_players_for_next_round, 2);
        assert_eq!(game.phase, GamePhase::AnswerReview);

        // crossed and eliminated partition the active roster
        let crossed = game.players_crossed.iter().copied().collect::<HashSet<_>>();
        assert!(crossed.is_disjoint(&game.eliminated));
        let union = crossed.union(&game.eliminated).copied().collect::<HashSet<_>>();
        assert_eq!(union, roster.iter().copied().collect::<HashSet<_>>());
    }

    #[test]
    fn last_round_with_one_player_ends_the_game() {
        let mut fx = fixture(1, 1);
        let start = open_question(&mut fx);
        let only = fx.roster[0];

        select(&mut fx, only, Door::B, start + 200);
        let out = cross(&mut fx, only, start + 300);
        assert!(matches!(out.last(), Some(ServerMessage::AnswerRevealed(_))));
        assert_eq!(fx.session.game().required_players_for_next_round, 1);

        let (out, _) = fire(&mut fx.session);
        assert!(matches!(out.as_slice(), [ServerMessage::RoundEnded(_)]));

        let (out, _) = fire(&mut fx.session);
        let [ServerMessage::GameOver(over)] = out.as_slice() else {
            panic!("expected game over, got {out:?}");
        };
        assert_eq!(over.winner.as_ref().map(|w| w.player_id), Some(only));
        assert_eq!(leaderboard_ids(&over.final_leaderboard), fx.roster);
        assert!(fx.session.game().is_game_over);
        assert!(!fx.session.is_retired());

        let (out, _) = fire(&mut fx.session);
        assert!(out.is_empty());
        assert!(fx.session.is_retired());
        assert!(fx.session.handle(SessionInput::Start, 0).is_empty());
    }

    #[test]
    fn duplicate_crossings_count_once() {
        let mut fx = fixture(3, 20);
        let start = open_question(&mut fx);
        let first = fx.roster[0];

        assert_eq!(cross(&mut fx, first, start + 100).len(), 1);
        assert!(cross(&mut fx, first, start + 200).is_empty());

        assert_eq!(fx.session.game().players_crossed.len(), 1);
        assert_eq!(fx.players.get(&first).map(|p| p.doors_crossed), Some(1));
    }

    #[test]
    fn stale_timer_after_early_advance_is_ignored() {
        let mut fx = fixture(1, 20);
        let start = open_question(&mut fx);
        let question_timer = fx.session.game().timer.unwrap();

        let only = fx.roster[0];
        cross(&mut fx, only, start + 100);
        assert_eq!(fx.session.game().phase, GamePhase::AnswerReview);

        let out = fx.session.handle(
            SessionInput::TimerElapsed {
                generation: question_timer.generation,
            },
            question_timer.fires_at,
        );
        assert!(out.is_empty());
        assert_eq!(fx.session.game().phase, GamePhase::AnswerReview);
        assert!(fx.session.game().eliminated.is_empty());
    }

    #[test]
    fn late_crossing_after_time_limit_is_ignored() {
        let mut fx = fixture(2, 20);
        open_question(&mut fx);
        let (_, closed_at) = fire(&mut fx.session);
        let late = fx.roster[0];

        assert!(cross(&mut fx, late, closed_at + 1).is_empty());
        assert_eq!(fx.players.get(&late).map(|p| p.doors_crossed), Some(0));
        assert_eq!(fx.session.game().required_players_for_next_round, 1);
    }

    #[test]
    fn eliminated_players_no_longer_count() {
        let mut fx = fixture(3, 20);
        let start = open_question(&mut fx);
        let roster = fx.roster.clone();
        cross(&mut fx, roster[0], start + 100);
        cross(&mut fx, roster[1], start + 100);
        // roster[2] is eliminated; required 3 -> 2
        fire(&mut fx.session);
        fire(&mut fx.session);
        fire(&mut fx.session);
        let (out, next_start) = fire(&mut fx.session);
        assert!(matches!(out.as_slice(), [ServerMessage::NewQuestion(_)]));
        assert_eq!(fx.session.game().current_round, 2);

        assert!(cross(&mut fx, roster[2], next_start + 100).is_empty());
        cross(&mut fx, roster[0], next_start + 200);
        let out = cross(&mut fx, roster[1], next_start + 300);

        assert!(matches!(out.last(), Some(ServerMessage::AnswerRevealed(_))));
        assert_eq!(fx.session.game().required_players_for_next_round, 1);
    }

    #[test]
    fn required_players_never_grows_nor_drops_below_one() {
        let mut fx = fixture(4, 6);
        fx.session.handle(SessionInput::Start, 0);
        let mut history = vec![fx.session.game().required_players_for_next_round];

        while !fx.session.game().is_game_over {
            fire(&mut fx.session);
            history.push(fx.session.game().required_players_for_next_round);
        }

        assert!(history.windows(2).all(|pair| pair[1] <= pair[0]));
        assert!(history.iter().all(|required| *required >= 1));
        assert_eq!(fx.session.game().current_round, 6);
    }

    #[test]
    fn wrong_answers_never_score_and_scores_never_drop() {
        let mut fx = fixture(2, 3);
        let (right, wrong) = (fx.roster[0], fx.roster[1]);
        fx.session.handle(SessionInput::Start, 0);
        let mut last_score = 0;

        while !fx.session.game().is_game_over {
            let (_, now) = fire(&mut fx.session);
            if fx.session.game().phase == GamePhase::QuestionActive {
                select(&mut fx, right, Door::B, now + 2_000);
                select(&mut fx, wrong, Door::D, now + 100);
            }
            let score = fx.players.get(&right).map(|p| p.score).unwrap_or_default();
            assert!(score >= last_score);
            last_score = score;
        }

        assert_eq!(fx.players.get(&wrong).map(|p| p.score), Some(0));
        assert_eq!(fx.players.get(&right).map(|p| p.correct_answers), Some(3));
        // 100 + floor(50 * (1 - 2000 / 15000)) = 143, three times
        assert_eq!(last_score, 3 * 143);
    }

    #[test]
    fn selection_outside_the_answer_window_is_not_recorded() {
        let mut fx = fixture(2, 20);
        let early = fx.roster[0];
        fx.session.handle(SessionInput::Start, 0);
        select(&mut fx, early, Door::A, 100);

        assert!(fx.session.game().players_answered.is_empty());
        assert_eq!(fx.players.get(&early).unwrap().last_answer_at, None);
    }

    #[test]
    fn answers_are_reset_when_a_new_question_opens() {
        let mut fx = fixture(1, 20);
        fx.session.handle(SessionInput::Start, 0);
        fx.players
            .update_player_position(&fx.roster[0], Position::default(), Some(Door::B));

        fire(&mut fx.session);

        let player = fx.players.get(&fx.roster[0]).unwrap();
        assert_eq!(player.current_door, None);
        assert_eq!(player.last_answer_at, None);
    }

    #[test]
    fn empty_question_source_ends_the_game() {
        let mut fx = fixture_with(2, 20, Arc::new(NoQuestions));
        fx.session.handle(SessionInput::Start, 0);

        let (out, _) = fire(&mut fx.session);

        assert!(matches!(out.as_slice(), [ServerMessage::GameOver(_)]));
        assert!(fx.session.game().is_game_over);
        assert_eq!(fx.session.snapshot().phase, GamePhase::GameOver);
    }

    #[test]
    fn questions_are_not_repeated_while_fresh_ones_remain() {
        let bank = QuestionBank::from_questions(vec![
            question("q1", Door::A),
            question("q2", Door::B),
            question("q3", Door::C),
        ])
        .unwrap();
        let mut fx = fixture_with(1, 3, Arc::new(bank));
        fx.session.handle(SessionInput::Start, 0);
        let mut seen = HashSet::new();

        while !fx.session.game().is_game_over {
            let (out, _) = fire(&mut fx.session);
            if let [ServerMessage::NewQuestion(payload)] = out.as_slice() {
                assert!(seen.insert(payload.question_id.clone()));
            }
        }
        assert_eq!(seen.len(), 3);
    }
}
