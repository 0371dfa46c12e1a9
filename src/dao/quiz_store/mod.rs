pub mod static_store;

use futures::future::BoxFuture;

use crate::dao::{models::QuestionEntity, storage::StorageResult};

/// Abstraction over the quiz content source consulted when a battle starts.
pub trait QuizStore: Send + Sync {
    /// Ordered question list for a quiz id.
    fn fetch_questions(
        &self,
        quiz_id: &str,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>>;
    /// Cheap liveness probe used by the health endpoint.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
