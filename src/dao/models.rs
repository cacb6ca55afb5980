use serde::{Deserialize, Serialize};

use crate::state::game::{Difficulty, Door, Question, QuestionOptions};

/// Quiz item as stored in the catalog file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    /// Catalog identifier, unique within the file.
    pub id: String,
    /// Question wording.
    pub text: String,
    /// Text behind each door.
    pub options: QuestionOptions,
    /// Door holding the right answer.
    pub correct_answer: Door,
    /// Explanation revealed with the answer.
    pub explanation: String,
    /// Difficulty tag.
    pub difficulty: Difficulty,
    /// Tale the question is about.
    pub theme: String,
}

impl From<QuestionEntity> for Question {
    fn from(value: QuestionEntity) -> Self {
        Self {
            id: value.id,
            text: value.text,
            options: value.options,
            correct: value.correct_answer,
            explanation: value.explanation,
            difficulty: value.difficulty,
            theme: value.theme,
        }
    }
}
