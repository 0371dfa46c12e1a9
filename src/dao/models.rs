use serde::{Deserialize, Serialize};

/// Quiz definition served by the content store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizEntity {
    /// Stable identifier referenced by battle rooms.
    pub id: String,
    /// Human readable quiz title.
    pub title: String,
    /// Ordered questions that make up the quiz.
    pub questions: Vec<QuestionEntity>,
}

/// Question entry inside a quiz.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    /// Stable identifier within the quiz.
    pub id: String,
    /// Question text presented to players.
    pub question: String,
    /// Answer options in display order.
    pub options: Vec<String>,
    /// Index into `options` of the correct answer.
    pub correct_answer: usize,
    /// Points awarded for a correct answer (1 when omitted).
    pub points: Option<u32>,
}
