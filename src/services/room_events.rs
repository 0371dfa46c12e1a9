use serde::Serialize;
use tracing::warn;

use crate::{
    dao::room_store::RoomSlot,
    dto::{
        battle::{BeginEvent, FinishEvent, HostChangedEvent, LobbySnapshot, ProgressEvent},
        ws::ServerMessage,
    },
    state::{
        ConnectionId,
        hub::RoomEvent,
        room::{Room, ScoreEntry},
    },
};

const EVENT_LOBBY: &str = "lobby";
const EVENT_BEGIN: &str = "begin";
const EVENT_PROGRESS: &str = "progress";
const EVENT_HOST_CHANGED: &str = "host_changed";
const EVENT_FINISH: &str = "finish";

/// Broadcast the current roster and settings to everyone in the room.
pub fn broadcast_lobby(slot: &RoomSlot, room: &Room) {
    let message = ServerMessage::Lobby(LobbySnapshot::of(room));
    send_room_event(slot, EVENT_LOBBY, &message);
}

/// Broadcast the battle kick-off with the synchronized start instant.
pub fn broadcast_begin(slot: &RoomSlot, room: &Room, start_at: u64) {
    let message = ServerMessage::Begin(BeginEvent::of(room, start_at));
    send_room_event(slot, EVENT_BEGIN, &message);
}

/// Broadcast up-to-date scores and the index of the question now in play.
pub fn broadcast_progress(slot: &RoomSlot, room: &Room) {
    let message = ServerMessage::Progress(ProgressEvent::of(room));
    send_room_event(slot, EVENT_PROGRESS, &message);
}

/// Broadcast that host authority moved to another connection.
pub fn broadcast_host_changed(slot: &RoomSlot, host: ConnectionId) {
    let message = ServerMessage::HostChanged(HostChangedEvent { host });
    send_room_event(slot, EVENT_HOST_CHANGED, &message);
}

/// Broadcast the final leaderboard.
pub fn broadcast_finish(slot: &RoomSlot, leaderboard: Vec<ScoreEntry>) {
    let message = ServerMessage::Finish(FinishEvent::of(leaderboard));
    send_room_event(slot, EVENT_FINISH, &message);
}

fn send_room_event(slot: &RoomSlot, event: &'static str, message: &impl Serialize) {
    match RoomEvent::json(event, message) {
        Ok(event) => slot.events().broadcast(event),
        Err(err) => {
            warn!(code = %slot.code(), event, error = %err, "failed to serialize room event");
        }
    }
}
