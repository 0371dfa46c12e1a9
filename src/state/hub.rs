use serde::Serialize;
use tokio::sync::broadcast;

/// Pre-serialized message fanned out to every connection subscribed to a room.
#[derive(Clone, Debug)]
pub struct RoomEvent {
    /// Event kind, used for logging and assertions.
    pub name: &'static str,
    /// Complete JSON frame as sent on the wire.
    pub json: String,
}

impl RoomEvent {
    /// Serialize `payload` into the frame broadcast for `name` events.
    pub fn json<T: Serialize>(name: &'static str, payload: &T) -> serde_json::Result<Self> {
        Ok(Self {
            name,
            json: serde_json::to_string(payload)?,
        })
    }
}

/// Broadcast hub carrying a single room's event stream.
pub struct RoomHub {
    sender: broadcast::Sender<RoomEvent>,
}

impl RoomHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: RoomEvent) {
        let _ = self.sender.send(event);
    }
}
