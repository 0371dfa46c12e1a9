use indexmap::IndexMap;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::format_system_time,
    state::room::{BattleSettings, Player, Question, Room, RoomPhase, ScoreEntry},
};

/// First message sent on a fresh connection, carrying its server-assigned id.
#[derive(Debug, Serialize, ToSchema)]
pub struct WelcomePayload {
    /// Identifier the server uses for this connection.
    pub connection_id: Uuid,
}

/// Direct acknowledgement for a successful `create`.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomCreatedPayload {
    /// Shareable code of the new room.
    pub code: String,
}

/// Direct acknowledgement for a successful `join`.
#[derive(Debug, Serialize, ToSchema)]
pub struct JoinedPayload {
    /// Code of the joined room.
    pub code: String,
    /// Quiz the room will play.
    pub quiz_id: String,
    /// Connection holding host authority.
    pub host: Uuid,
    /// Settings at join time.
    pub settings: BattleSettings,
}

/// Client-safe projection of a question, with the answer key stripped.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionView {
    /// Stable identifier within the quiz.
    pub id: String,
    /// Question text.
    pub question: String,
    /// Answer options in display order.
    pub options: Vec<String>,
    /// Points at stake.
    pub points: u32,
}

impl From<&Question> for QuestionView {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id.clone(),
            question: question.question.clone(),
            options: question.options.clone(),
            points: question.points,
        }
    }
}

/// Roster and settings snapshot broadcast while a room sits in the lobby.
#[derive(Debug, Serialize, ToSchema)]
pub struct LobbySnapshot {
    /// Room code.
    pub code: String,
    /// Quiz the room will play.
    pub quiz_id: String,
    /// Connection holding host authority.
    pub host: Uuid,
    /// Current settings.
    pub settings: BattleSettings,
    /// Roster keyed by connection id, in join order.
    #[schema(value_type = Object)]
    pub players: IndexMap<Uuid, Player>,
    /// Room creation time, RFC 3339.
    pub created_at: String,
}

impl LobbySnapshot {
    /// Capture the lobby state of `room`.
    pub fn of(room: &Room) -> Self {
        Self {
            code: room.code().to_string(),
            quiz_id: room.quiz_id().to_string(),
            host: room.host(),
            settings: room.settings().clone(),
            players: room.players().clone(),
            created_at: format_system_time(room.created_at()),
        }
    }
}

/// Kick-off event carrying the synchronized start instant.
#[derive(Debug, Serialize, ToSchema)]
pub struct BeginEvent {
    /// Epoch milliseconds at which clients start their timers.
    pub start_at: u64,
    /// Questions of this battle, answer keys stripped.
    pub questions: Vec<QuestionView>,
    /// Settings the battle runs with.
    pub settings: BattleSettings,
}

impl BeginEvent {
    /// Capture the start of `room`'s battle.
    pub fn of(room: &Room, start_at: u64) -> Self {
        Self {
            start_at,
            questions: room.questions().iter().map(QuestionView::from).collect(),
            settings: room.settings().clone(),
        }
    }
}

/// Scoring and progression snapshot broadcast while a battle runs.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProgressEvent {
    /// Index of the question currently being played.
    pub index: usize,
    /// Roster with up-to-date scores, keyed by connection id.
    #[schema(value_type = Object)]
    pub players: IndexMap<Uuid, Player>,
}

impl ProgressEvent {
    /// Capture the progression state of `room`.
    pub fn of(room: &Room) -> Self {
        Self {
            index: room.current_index(),
            players: room.players().clone(),
        }
    }
}

/// Broadcast when host authority moves to another connection.
#[derive(Debug, Serialize, ToSchema)]
pub struct HostChangedEvent {
    /// Connection now holding host authority.
    pub host: Uuid,
}

/// Terminal event carrying the final leaderboard, score descending.
#[derive(Debug, Serialize, ToSchema)]
pub struct FinishEvent {
    /// Final standings, one entry per member present at completion.
    pub leaderboard: Vec<ScoreEntry>,
}

impl FinishEvent {
    /// Capture the final leaderboard.
    pub fn of(leaderboard: Vec<ScoreEntry>) -> Self {
        Self { leaderboard }
    }
}

/// Read-only room snapshot served over HTTP.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomSummary {
    /// Room code.
    pub code: String,
    /// Quiz the room plays.
    pub quiz_id: String,
    /// Current phase: `lobby`, `in_progress` or `finished`.
    pub phase: String,
    /// Connection holding host authority.
    pub host: Uuid,
    /// Current settings.
    pub settings: BattleSettings,
    /// Roster keyed by connection id, in join order.
    #[schema(value_type = Object)]
    pub players: IndexMap<Uuid, Player>,
    /// Room creation time, RFC 3339.
    pub created_at: String,
}

impl RoomSummary {
    /// Capture a client-safe summary of `room`.
    pub fn of(room: &Room) -> Self {
        let phase = match room.phase() {
            RoomPhase::Lobby => "lobby",
            RoomPhase::InProgress => "in_progress",
            RoomPhase::Finished => "finished",
        };
        Self {
            code: room.code().to_string(),
            quiz_id: room.quiz_id().to_string(),
            phase: phase.to_string(),
            host: room.host(),
            settings: room.settings().clone(),
            players: room.players().clone(),
            created_at: format_system_time(room.created_at()),
        }
    }
}
