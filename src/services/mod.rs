/// Room lifecycle, scoring, and battle progression.
pub mod battle_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Room broadcast message generation.
pub mod room_events;
/// WebSocket connection and command handling service.
pub mod websocket_service;
