use serde::Serialize;
use utoipa::ToSchema;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Number of rooms currently held in memory.
    pub active_rooms: usize,
    /// Number of open WebSocket connections.
    pub connections: usize,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok(active_rooms: usize, connections: usize) -> Self {
        Self {
            status: "ok".to_string(),
            active_rooms,
            connections,
        }
    }

    /// Create a health response indicating the quiz catalog is unavailable.
    pub fn degraded(active_rooms: usize, connections: usize) -> Self {
        Self {
            status: "degraded".to_string(),
            active_rooms,
            connections,
        }
    }
}
