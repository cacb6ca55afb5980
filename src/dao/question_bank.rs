//! Static catalog of quiz items with random draws.

use std::collections::HashSet;

use rand::seq::IndexedRandom;
use thiserror::Error;

use crate::{dao::models::QuestionEntity, state::game::Question};

/// Catalog compiled into the binary.
const BUILTIN_CATALOG: &str = include_str!("../../data/questions.json");

/// Errors raised while loading a question catalog.
#[derive(Debug, Error)]
pub enum QuestionBankError {
    /// The catalog is not valid JSON for [`QuestionEntity`] items.
    #[error("invalid question catalog: {0}")]
    Parse(#[from] serde_json::Error),
    /// The catalog has no question at all.
    #[error("question catalog is empty")]
    Empty,
    /// Two items share the same identifier.
    #[error("duplicate question id `{0}`")]
    DuplicateId(String),
}

/// Read access to the quiz catalog used by the session orchestrator.
pub trait QuestionSource: Send + Sync {
    /// Draw up to `count` distinct questions at random.
    fn draw(&self, count: usize) -> Vec<Question>;

    /// Number of questions available.
    fn len(&self) -> usize;

    /// True when no question can be drawn.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory question catalog.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// Load the catalog shipped with the binary.
    pub fn builtin() -> Result<Self, QuestionBankError> {
        Self::from_json_str(BUILTIN_CATALOG)
    }

    /// Parse a JSON array of questions.
    pub fn from_json_str(contents: &str) -> Result<Self, QuestionBankError> {
        let entities = serde_json::from_str::<Vec<QuestionEntity>>(contents)?;
        Self::from_questions(entities.into_iter().map(Into::into).collect())
    }

    /// Build a catalog from already constructed questions.
    pub fn from_questions(questions: Vec<Question>) -> Result<Self, QuestionBankError> {
        if questions.is_empty() {
            return Err(QuestionBankError::Empty);
        }

        let mut seen = HashSet::new();
        for question in &questions {
            if !seen.insert(question.id.as_str()) {
                return Err(QuestionBankError::DuplicateId(question.id.clone()));
            }
        }

        Ok(Self { questions })
    }
}

impl QuestionSource for QuestionBank {
    fn draw(&self, count: usize) -> Vec<Question> {
        self.questions
            .choose_multiple(&mut rand::rng(), count)
            .cloned()
            .collect()
    }

    fn len(&self) -> usize {
        self.questions.len()
    }
}
