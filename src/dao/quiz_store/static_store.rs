use std::{collections::HashMap, fs, io::ErrorKind, path::Path};

use futures::future::{self, BoxFuture};
use tracing::{info, warn};

use crate::dao::{
    models::{QuestionEntity, QuizEntity},
    quiz_store::QuizStore,
    storage::{StorageError, StorageResult},
};

/// Quiz content loaded once at startup and served from memory.
///
/// The battle coordinator only reads quiz content, so a flat JSON file is
/// enough of a backend; swapping in a remote store means implementing
/// [`QuizStore`] against it.
pub struct StaticQuizStore {
    quizzes: HashMap<String, QuizEntity>,
}

impl StaticQuizStore {
    /// Build a store from already materialized quizzes.
    pub fn from_quizzes(quizzes: Vec<QuizEntity>) -> Self {
        let quizzes = quizzes
            .into_iter()
            .map(|quiz| (quiz.id.clone(), quiz))
            .collect();
        Self { quizzes }
    }

    /// Load the quiz file from disk, starting empty when it is missing or
    /// unreadable.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Vec<QuizEntity>>(&contents) {
                Ok(quizzes) => {
                    info!(path = %path.display(), count = quizzes.len(), "loaded quiz file");
                    Self::from_quizzes(quizzes)
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse quiz file; starting with no quizzes"
                    );
                    Self::from_quizzes(Vec::new())
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "quiz file not found; starting with no quizzes");
                Self::from_quizzes(Vec::new())
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read quiz file; starting with no quizzes"
                );
                Self::from_quizzes(Vec::new())
            }
        }
    }

    /// Number of quizzes currently served.
    pub fn quiz_count(&self) -> usize {
        self.quizzes.len()
    }
}

impl QuizStore for StaticQuizStore {
    fn fetch_questions(
        &self,
        quiz_id: &str,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let result = self
            .quizzes
            .get(quiz_id)
            .map(|quiz| quiz.questions.clone())
            .ok_or_else(|| StorageError::not_found(format!("quiz `{quiz_id}`")));
        Box::pin(future::ready(result))
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(future::ready(Ok(())))
    }
}
