use std::sync::Arc;

use dashmap::{DashMap, Entry};

use crate::dao::room_store::{RoomSlot, RoomStore};

/// In-memory room table backed by a concurrent map.
#[derive(Default)]
pub struct MemoryRoomStore {
    rooms: DashMap<String, Arc<RoomSlot>>,
}

impl MemoryRoomStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoomStore for MemoryRoomStore {
    fn try_insert(&self, slot: Arc<RoomSlot>) -> bool {
        match self.rooms.entry(slot.code().to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(slot);
                true
            }
        }
    }

    fn get(&self, code: &str) -> Option<Arc<RoomSlot>> {
        self.rooms.get(code).map(|entry| entry.value().clone())
    }

    fn remove(&self, code: &str) -> Option<Arc<RoomSlot>> {
        self.rooms.remove(code).map(|(_, slot)| slot)
    }

    fn count(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::room::{BattleSettings, Room};
    use uuid::Uuid;

    fn slot(code: &str) -> Arc<RoomSlot> {
        let room = Room::new(
            code.to_string(),
            "quiz-1".into(),
            Uuid::new_v4(),
            "Alice".into(),
            BattleSettings {
                quiz_time_seconds: 60,
                num_questions: 10,
                max_players: 4,
            },
        );
        Arc::new(RoomSlot::new(room, 16))
    }

    #[test]
    fn insert_is_rejected_on_a_taken_code() {
        let store = MemoryRoomStore::new();
        assert!(store.try_insert(slot("AAAA00")));
        assert!(!store.try_insert(slot("AAAA00")));
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn remove_frees_the_code() {
        let store = MemoryRoomStore::new();
        assert!(store.try_insert(slot("AAAA00")));
        assert!(store.remove("AAAA00").is_some());
        assert!(store.get("AAAA00").is_none());
        assert!(store.remove("AAAA00").is_none());
        assert!(store.try_insert(slot("AAAA00")));
    }
}
