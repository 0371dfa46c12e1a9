pub mod code;
pub mod hub;
pub mod registry;
pub mod room;

use std::sync::Arc;
use std::time::SystemTime;

use dashmap::DashMap;

use crate::{
    config::AppConfig,
    dao::{quiz_store::QuizStore, room_store::RoomStore},
    state::registry::RoomRegistry,
};

pub use self::room::ConnectionId;

/// Shared handle to the application state.
pub type SharedState = Arc<AppState>;

#[derive(Clone)]
/// Bookkeeping entry for a live WebSocket connection.
pub struct ConnectionEntry {
    /// When the socket completed its upgrade.
    pub connected_at: SystemTime,
}

/// Central application state: configuration, quiz content, live rooms and
/// connections.
pub struct AppState {
    config: AppConfig,
    quizzes: Arc<dyn QuizStore>,
    rooms: RoomRegistry,
    connections: DashMap<ConnectionId, ConnectionEntry>,
}

impl AppState {
    /// Construct the shared state wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(
        config: AppConfig,
        quizzes: Arc<dyn QuizStore>,
        room_store: Arc<dyn RoomStore>,
    ) -> SharedState {
        let hub_capacity = config.hub_capacity();
        Arc::new(Self {
            config,
            quizzes,
            rooms: RoomRegistry::new(room_store, hub_capacity),
            connections: DashMap::new(),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Quiz content source consulted at battle start.
    pub fn quizzes(&self) -> Arc<dyn QuizStore> {
        self.quizzes.clone()
    }

    /// Registry of live rooms.
    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    /// Registry of live connections keyed by their identifier.
    pub fn connections(&self) -> &DashMap<ConnectionId, ConnectionEntry> {
        &self.connections
    }
}
