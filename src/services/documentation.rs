use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Battle Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::battle::ws_handler,
        crate::routes::battle::get_room,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::battle::RoomSummary,
            crate::dto::ws::ClientCommand,
            crate::dto::ws::ServerMessage,
            crate::dto::ws::CommandKind,
            crate::state::room::BattleSettings,
            crate::state::room::SettingsPatch,
            crate::state::room::Player,
            crate::state::room::ScoreEntry,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "battle", description = "Room lifecycle and battle WebSocket messages"),
    )
)]
pub struct ApiDoc;
