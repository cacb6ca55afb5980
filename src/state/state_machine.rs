use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Phases of the per-round cycle a game goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    /// Game created, not started yet.
    Waiting,
    /// Players reposition before the question shows up.
    Movement,
    /// Question displayed; players pick and cross a door.
    QuestionActive,
    /// Correct door, explanation and scores are revealed.
    AnswerReview,
    /// Short pause between two rounds.
    RoundEnd,
    /// Terminal phase; the game is retired after a grace window.
    GameOver,
}

/// Why the answer window closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The question timer elapsed; players who did not cross are eliminated.
    TimeLimit,
    /// Enough distinct players crossed a door before the deadline.
    EnoughCrossed,
}

/// Why the game reached its terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// The last round ended.
    AllRoundsPlayed,
    /// The question source could not provide a question.
    QuestionsExhausted,
}

/// Events that move a game from one phase to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// The room started its game.
    Start,
    /// The movement timer elapsed and a question was drawn.
    QuestionDrawn,
    /// The answer window closed.
    QuestionClosed(CloseReason),
    /// The review timer elapsed.
    ReviewElapsed,
    /// The round-end timer elapsed and another round remains.
    NextRound,
    /// The game is over.
    Finish(FinishReason),
}

/// Error returned when an event cannot be applied from the current phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the game was in when the event was received.
    pub from: GamePhase,
    /// The event that cannot be applied from this phase.
    pub event: PhaseEvent,
}

/// Compute the phase reached by applying `event` in `from`, if the transition is legal.
pub fn next_phase(from: GamePhase, event: PhaseEvent) -> Result<GamePhase, InvalidTransition> {
    let next = match (from, event) {
        (GamePhase::Waiting, PhaseEvent::Start) => GamePhase::Movement,
        (GamePhase::Movement, PhaseEvent::QuestionDrawn) => GamePhase::QuestionActive,
        (GamePhase::Movement, PhaseEvent::Finish(FinishReason::QuestionsExhausted)) => {
            GamePhase::GameOver
        }
        (GamePhase::QuestionActive, PhaseEvent::QuestionClosed(_)) => GamePhase::AnswerReview,
        (GamePhase::AnswerReview, PhaseEvent::ReviewElapsed) => GamePhase::RoundEnd,
        (GamePhase::RoundEnd, PhaseEvent::NextRound) => GamePhase::Movement,
        (GamePhase::RoundEnd, PhaseEvent::Finish(FinishReason::AllRoundsPlayed)) => {
            GamePhase::GameOver
        }
        (from, event) => return Err(InvalidTransition { from, event }),
    };

    Ok(next)
}
