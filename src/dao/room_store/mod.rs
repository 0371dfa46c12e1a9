pub mod memory;

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::state::{hub::RoomHub, room::Room};

/// A registered room together with its serialization and fan-out primitives.
///
/// The mutex is the per-room serialization contract: every mutation of the
/// wrapped [`Room`] happens under it, and broadcasts are sent before it is
/// released, so subscribers observe fully applied states in a total order.
pub struct RoomSlot {
    code: String,
    room: Mutex<Room>,
    events: RoomHub,
}

impl RoomSlot {
    /// Wrap a freshly built room, allocating its broadcast hub.
    pub fn new(room: Room, hub_capacity: usize) -> Self {
        Self {
            code: room.code().to_string(),
            room: Mutex::new(room),
            events: RoomHub::new(hub_capacity),
        }
    }

    /// Room code this slot is keyed by.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// The room, behind its serialization mutex.
    pub fn room(&self) -> &Mutex<Room> {
        &self.room
    }

    /// Broadcast hub for this room's event stream.
    pub fn events(&self) -> &RoomHub {
        &self.events
    }
}

/// Narrow interface to the table of live rooms.
///
/// Today this is an in-process map; a distributed backend would implement the
/// same surface, keeping the slot as the unit that carries per-room
/// serialization.
pub trait RoomStore: Send + Sync {
    /// Insert a slot under its code. Returns false when the code is taken.
    fn try_insert(&self, slot: Arc<RoomSlot>) -> bool;
    /// Look up a live room by code.
    fn get(&self, code: &str) -> Option<Arc<RoomSlot>>;
    /// Delete a room entry, returning it when it existed.
    fn remove(&self, code: &str) -> Option<Arc<RoomSlot>>;
    /// Number of live rooms.
    fn count(&self) -> usize;
}
