use std::sync::Arc;

use tracing::info;

use crate::dao::room_store::{RoomSlot, RoomStore};
use crate::state::{
    code,
    room::{BattleSettings, ConnectionId, Room},
};

/// Authoritative map from room code to live room.
///
/// Creation, lookup and removal all go through the backing [`RoomStore`]; the
/// registry's own job is code allocation and lifecycle logging.
pub struct RoomRegistry {
    store: Arc<dyn RoomStore>,
    hub_capacity: usize,
}

impl RoomRegistry {
    /// Build a registry over the given store.
    pub fn new(store: Arc<dyn RoomStore>, hub_capacity: usize) -> Self {
        Self {
            store,
            hub_capacity,
        }
    }

    /// Allocate a code and register a lobby room with the creator as host.
    pub fn create(
        &self,
        quiz_id: &str,
        host: ConnectionId,
        host_name: &str,
        settings: BattleSettings,
    ) -> Arc<RoomSlot> {
        loop {
            let room_code = code::generate();
            let room = Room::new(
                room_code.clone(),
                quiz_id.to_string(),
                host,
                host_name.to_string(),
                settings.clone(),
            );
            let slot = Arc::new(RoomSlot::new(room, self.hub_capacity));
            if self.store.try_insert(slot.clone()) {
                info!(code = %room_code, quiz_id = %quiz_id, "room created");
                return slot;
            }
            // code collision: retry with a fresh one
        }
    }

    /// Look up a live room by code.
    pub fn get(&self, code: &str) -> Option<Arc<RoomSlot>> {
        self.store.get(code)
    }

    /// Remove a room entry, returning it when it existed.
    pub fn remove(&self, code: &str) -> Option<Arc<RoomSlot>> {
        let removed = self.store.remove(code);
        if removed.is_some() {
            info!(code = %code, "room removed");
        }
        removed
    }

    /// Number of live rooms.
    pub fn active_rooms(&self) -> usize {
        self.store.count()
    }
}
