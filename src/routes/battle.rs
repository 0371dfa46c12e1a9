use axum::{
    Json, Router,
    extract::{Path, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};

use crate::{
    dto::battle::RoomSummary,
    error::AppError,
    services::{battle_service, websocket_service},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/api/battle",
    responses((status = 101, description = "Switching protocols to WebSocket"))
)]
/// Upgrade the HTTP connection into a battle WebSocket session.
pub async fn ws_handler(
    State(state): State<SharedState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let shared_state = state.clone();
    ws.on_upgrade(move |socket| websocket_service::handle_socket(shared_state.clone(), socket))
}

#[utoipa::path(
    get,
    path = "/api/battle/{code}",
    params(("code" = String, Path, description = "Room code")),
    responses(
        (status = 200, description = "Read-only room snapshot", body = RoomSummary),
        (status = 404, description = "No live room with this code")
    )
)]
/// Return a read-only snapshot of a live room.
pub async fn get_room(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<RoomSummary>, AppError> {
    let summary = battle_service::room_summary(&state, &code).await?;
    Ok(Json(summary))
}

/// Configure the battle endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/api/battle", get(ws_handler))
        .route("/api/battle/{code}", get(get_room))
}
