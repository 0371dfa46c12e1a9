use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report liveness along with the room and connection gauges, noting when the
/// quiz catalog cannot be reached.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let active_rooms = state.rooms().active_rooms();
    let connections = state.connections().len();

    if let Err(err) = state.quizzes().health_check().await {
        warn!(error = %err, "quiz catalog health check failed");
        return HealthResponse::degraded(active_rooms, connections);
    }

    HealthResponse::ok(active_rooms, connections)
}
