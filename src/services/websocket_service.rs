use std::time::SystemTime;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{
    sync::{broadcast, broadcast::error::RecvError, mpsc},
    task::JoinHandle,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        battle::{RoomCreatedPayload, WelcomePayload},
        ws::{AckPayload, ClientCommand, CommandKind, ServerMessage},
    },
    error::ServiceError,
    services::battle_service,
    state::{ConnectionEntry, ConnectionId, SharedState, hub::RoomEvent},
};

/// Error returned when the writer side of a socket has gone away.
#[derive(Debug, Error)]
#[error("connection closed")]
struct ConnectionClosed;

/// The room a connection is currently seated in, together with the task that
/// forwards the room's broadcasts onto the connection's writer.
struct RoomBinding {
    code: String,
    forwarder: JoinHandle<()>,
}

/// Handle the full lifecycle for an individual battle WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let conn: ConnectionId = Uuid::new_v4();
    state.connections().insert(
        conn,
        ConnectionEntry {
            connected_at: SystemTime::now(),
        },
    );
    info!(connection = %conn, "battle client connected");

    let welcome = ServerMessage::Welcome(WelcomePayload {
        connection_id: conn,
    });
    if send_message(&outbound_tx, &welcome).is_err() {
        state.connections().remove(&conn);
        finalize(writer_task, outbound_tx).await;
        return;
    }

    let mut binding: Option<RoomBinding> = None;

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                let reply = dispatch(&state, conn, &mut binding, &outbound_tx, &text).await;
                if send_message(&outbound_tx, &reply).is_err() {
                    break;
                }
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(connection = %conn, "battle client closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(connection = %conn, error = %err, "websocket error");
                break;
            }
        }
    }

    disconnect(&state, conn, binding).await;
    finalize(writer_task, outbound_tx).await;
}

/// Parse one text frame and apply it, turning any failure into the direct
/// error report for the sender. Broadcasts never flow through here.
async fn dispatch(
    state: &SharedState,
    conn: ConnectionId,
    binding: &mut Option<RoomBinding>,
    tx: &mpsc::UnboundedSender<Message>,
    text: &str,
) -> ServerMessage {
    let command = match ClientCommand::from_json_str(text) {
        Ok(command) => command,
        Err(err) => {
            warn!(connection = %conn, error = %err, "rejected battle command");
            return ServerMessage::error(None, &err);
        }
    };
    let kind = command.kind();

    match apply(state, conn, binding, tx, command).await {
        Ok(reply) => reply,
        Err(err) => {
            warn!(connection = %conn, error = %err, "battle command failed");
            ServerMessage::error(kind, &err)
        }
    }
}

async fn apply(
    state: &SharedState,
    conn: ConnectionId,
    binding: &mut Option<RoomBinding>,
    tx: &mpsc::UnboundedSender<Message>,
    command: ClientCommand,
) -> Result<ServerMessage, ServiceError> {
    match command {
        ClientCommand::Create(payload) => {
            ensure_unbound(state, binding)?;
            let (code, events) = battle_service::create_room(state, conn, payload).await?;
            let forwarder = spawn_forwarder(events, tx.clone());
            *binding = Some(RoomBinding {
                code: code.clone(),
                forwarder,
            });
            Ok(ServerMessage::RoomCreated(RoomCreatedPayload { code }))
        }
        ClientCommand::Join(payload) => {
            ensure_unbound(state, binding)?;
            let (joined, events) = battle_service::join_room(state, conn, payload).await?;
            let forwarder = spawn_forwarder(events, tx.clone());
            *binding = Some(RoomBinding {
                code: joined.code.clone(),
                forwarder,
            });
            Ok(ServerMessage::Joined(joined))
        }
        ClientCommand::UpdateSettings(payload) => {
            battle_service::update_settings(state, conn, payload).await?;
            Ok(ack(CommandKind::UpdateSettings))
        }
        ClientCommand::Start(payload) => {
            battle_service::start_battle(state, conn, payload).await?;
            Ok(ack(CommandKind::Start))
        }
        ClientCommand::Answer(payload) => {
            battle_service::submit_answer(state, conn, payload).await?;
            Ok(ack(CommandKind::Answer))
        }
        ClientCommand::Advance(payload) => {
            battle_service::advance_battle(state, conn, payload).await?;
            Ok(ack(CommandKind::Advance))
        }
        ClientCommand::Unknown => {
            Err(ServiceError::InvalidInput("unknown command type".to_string()))
        }
    }
}

/// A connection sits in at most one room. A binding whose room has already
/// been torn down no longer counts; it is released here so the connection can
/// move on.
fn ensure_unbound(
    state: &SharedState,
    binding: &mut Option<RoomBinding>,
) -> Result<(), ServiceError> {
    if let Some(bound) = binding.as_ref() {
        if state.rooms().get(&bound.code).is_some() {
            return Err(ServiceError::InvalidState(format!(
                "already in room `{}`",
                bound.code
            )));
        }
        if let Some(stale) = binding.take() {
            stale.forwarder.abort();
        }
    }
    Ok(())
}

/// Forward room broadcasts onto the connection's writer until either side
/// goes away. A lagging subscriber skips what it missed and keeps going.
fn spawn_forwarder(
    mut events: broadcast::Receiver<RoomEvent>,
    tx: mpsc::UnboundedSender<Message>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if tx.send(Message::Text(event.json.into())).is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "room event subscriber lagged; continuing");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

async fn disconnect(state: &SharedState, conn: ConnectionId, binding: Option<RoomBinding>) {
    if let Some(bound) = binding {
        bound.forwarder.abort();
        battle_service::leave_room(state, conn, &bound.code).await;
    }
    let session = state.connections().remove(&conn);
    let duration = session
        .and_then(|(_, entry)| entry.connected_at.elapsed().ok())
        .unwrap_or_default();
    info!(
        connection = %conn,
        duration_ms = duration.as_millis() as u64,
        "battle client disconnected"
    );
}

fn ack(command: CommandKind) -> ServerMessage {
    ServerMessage::Ack(AckPayload { command })
}

/// Serialize a payload and push it onto the provided WebSocket sender.
///
/// Serialization failures are logged and swallowed; a closed writer channel
/// is reported so the caller can wind the connection down.
fn send_message<T>(
    tx: &mpsc::UnboundedSender<Message>,
    value: &T,
) -> Result<(), ConnectionClosed>
where
    T: ?Sized + serde::Serialize + std::fmt::Debug,
{
    let payload = match serde_json::to_string(value) {
        Ok(p) => p,
        Err(err) => {
            warn!(error = %err, "failed to serialize message `{value:?}`");
            return Ok(());
        }
    };

    tx.send(Message::Text(payload.into()))
        .map_err(|_| ConnectionClosed)
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
