use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::{
        battle::{
            BeginEvent, FinishEvent, HostChangedEvent, JoinedPayload, LobbySnapshot,
            ProgressEvent, RoomCreatedPayload, WelcomePayload,
        },
        validation::{validate_display_name, validate_identifier, validate_room_code},
    },
    error::ServiceError,
    state::room::SettingsPatch,
};

/// Command identifiers echoed back in acknowledgements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Open a new room.
    Create,
    /// Enter an existing room.
    Join,
    /// Patch lobby settings.
    UpdateSettings,
    /// Launch the battle.
    Start,
    /// Record an answer.
    Answer,
    /// Move to the next question.
    Advance,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
/// Commands accepted from battle WebSocket clients.
#[serde(tag = "type")]
pub enum ClientCommand {
    /// Open a new room for a quiz.
    #[serde(rename = "create")]
    Create(CreateCommand),
    /// Enter an existing room by code.
    #[serde(rename = "join")]
    Join(JoinCommand),
    /// Patch the settings of a lobby the sender hosts.
    #[serde(rename = "update_settings")]
    UpdateSettings(UpdateSettingsCommand),
    /// Launch the battle of a lobby the sender hosts.
    #[serde(rename = "start")]
    Start(StartCommand),
    /// Record an answer for a question of a running battle.
    #[serde(rename = "answer")]
    Answer(AnswerCommand),
    /// Move a battle the sender hosts to the next question.
    #[serde(rename = "advance")]
    Advance(AdvanceCommand),
    /// Anything with an unrecognized `type` tag.
    #[serde(other)]
    Unknown,
}

impl ClientCommand {
    /// Parse a raw text frame and validate its fields.
    pub fn from_json_str(payload: &str) -> Result<Self, ServiceError> {
        let command: Self = serde_json::from_str(payload)
            .map_err(|err| ServiceError::InvalidInput(format!("malformed command: {err}")))?;
        command.check()?;
        Ok(command)
    }

    /// Command kind echoed in acknowledgements, when recognized.
    pub fn kind(&self) -> Option<CommandKind> {
        match self {
            Self::Create(_) => Some(CommandKind::Create),
            Self::Join(_) => Some(CommandKind::Join),
            Self::UpdateSettings(_) => Some(CommandKind::UpdateSettings),
            Self::Start(_) => Some(CommandKind::Start),
            Self::Answer(_) => Some(CommandKind::Answer),
            Self::Advance(_) => Some(CommandKind::Advance),
            Self::Unknown => None,
        }
    }

    fn check(&self) -> Result<(), ServiceError> {
        match self {
            Self::Create(payload) => payload.validate()?,
            Self::Join(payload) => payload.validate()?,
            Self::UpdateSettings(payload) => payload.validate()?,
            Self::Start(payload) => payload.validate()?,
            Self::Answer(payload) => payload.validate()?,
            Self::Advance(payload) => payload.validate()?,
            Self::Unknown => {
                return Err(ServiceError::InvalidInput("unknown command type".to_string()));
            }
        }
        Ok(())
    }
}

/// Payload of the `create` command.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateCommand {
    /// Quiz to battle on.
    pub quiz_id: String,
    /// Display name of the creator, who becomes host.
    pub name: String,
    /// Overrides applied on top of the configured defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<SettingsPatch>,
}

impl Validate for CreateCommand {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_identifier(&self.quiz_id) {
            errors.add("quiz_id", e);
        }
        if let Err(e) = validate_display_name(&self.name) {
            errors.add("name", e);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Payload of the `join` command.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct JoinCommand {
    /// Code of the room to enter.
    pub code: String,
    /// Display name to appear on the roster.
    pub name: String,
}

impl Validate for JoinCommand {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_room_code(&self.code) {
            errors.add("code", e);
        }
        if let Err(e) = validate_display_name(&self.name) {
            errors.add("name", e);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Payload of the `update_settings` command.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct UpdateSettingsCommand {
    /// Code of the room to reconfigure.
    pub code: String,
    /// Fields to change; omitted or zero fields keep their value.
    pub settings: SettingsPatch,
}

impl Validate for UpdateSettingsCommand {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_room_code(&self.code) {
            errors.add("code", e);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Payload of the `start` command.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct StartCommand {
    /// Code of the room to launch.
    pub code: String,
}

impl Validate for StartCommand {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_room_code(&self.code) {
            errors.add("code", e);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Payload of the `answer` command.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AnswerCommand {
    /// Code of the room being played.
    pub code: String,
    /// Question the answer is for.
    pub question_id: String,
    /// Zero-based index of the selected option.
    pub selected_option: usize,
}

impl Validate for AnswerCommand {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_room_code(&self.code) {
            errors.add("code", e);
        }
        if let Err(e) = validate_identifier(&self.question_id) {
            errors.add("question_id", e);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Payload of the `advance` command.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AdvanceCommand {
    /// Code of the room to advance.
    pub code: String,
    /// Question-id to correct-option overrides applied while scoring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer_overrides: Option<HashMap<String, usize>>,
}

impl Validate for AdvanceCommand {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_room_code(&self.code) {
            errors.add("code", e);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Direct acknowledgement of a successfully applied command.
#[derive(Debug, Serialize, ToSchema)]
pub struct AckPayload {
    /// Command being acknowledged.
    pub command: CommandKind,
}

/// Direct report of a rejected or failed command.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorPayload {
    /// Command being rejected, when it could be recognized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<CommandKind>,
    /// Machine-readable failure category.
    pub code: String,
    /// Human-readable detail.
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Messages sent to battle WebSocket clients.
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Connection greeting with the server-assigned id.
    #[serde(rename = "welcome")]
    Welcome(WelcomePayload),
    /// Direct acknowledgement of a `create`.
    #[serde(rename = "room_created")]
    RoomCreated(RoomCreatedPayload),
    /// Direct acknowledgement of a `join`.
    #[serde(rename = "joined")]
    Joined(JoinedPayload),
    /// Direct acknowledgement of any other applied command.
    #[serde(rename = "ack")]
    Ack(AckPayload),
    /// Direct rejection of a command.
    #[serde(rename = "error")]
    Error(ErrorPayload),
    /// Roster or settings change, broadcast to the room.
    #[serde(rename = "lobby")]
    Lobby(LobbySnapshot),
    /// Battle start, broadcast to the room.
    #[serde(rename = "begin")]
    Begin(BeginEvent),
    /// Scores and question progression, broadcast to the room.
    #[serde(rename = "progress")]
    Progress(ProgressEvent),
    /// Host authority transfer, broadcast to the room.
    #[serde(rename = "host_changed")]
    HostChanged(HostChangedEvent),
    /// Battle completion with the final leaderboard, broadcast to the room.
    #[serde(rename = "finish")]
    Finish(FinishEvent),
}

impl ServerMessage {
    /// Build the error report for a failed command.
    pub fn error(command: Option<CommandKind>, err: &ServiceError) -> Self {
        Self::Error(ErrorPayload {
            command,
            code: err.code().to_string(),
            message: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_create_command() {
        let frame = r#"{"type":"create","quiz_id":"geo-01","name":"Ada"}"#;
        match ClientCommand::from_json_str(frame) {
            Ok(ClientCommand::Create(payload)) => {
                assert_eq!(payload.quiz_id, "geo-01");
                assert_eq!(payload.name, "Ada");
                assert!(payload.settings.is_none());
            }
            other => panic!("expected create command, got {other:?}"),
        }
    }

    #[test]
    fn parses_advance_overrides() {
        let frame = r#"{"type":"advance","code":"00FFAA","correct_answer_overrides":{"q2":3}}"#;
        match ClientCommand::from_json_str(frame) {
            Ok(ClientCommand::Advance(payload)) => {
                let overrides = payload.correct_answer_overrides.unwrap();
                assert_eq!(overrides.get("q2"), Some(&3));
            }
            other => panic!("expected advance command, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_command_types() {
        let frame = r#"{"type":"dance"}"#;
        let err = ClientCommand::from_json_str(frame).unwrap_err();
        assert_eq!(err.code(), "malformed");
    }

    #[test]
    fn rejects_invalid_json() {
        let err = ClientCommand::from_json_str("not json").unwrap_err();
        assert_eq!(err.code(), "malformed");
    }

    #[test]
    fn rejects_a_blank_join_name() {
        let frame = r#"{"type":"join","code":"00FFAA","name":"   "}"#;
        let err = ClientCommand::from_json_str(frame).unwrap_err();
        assert_eq!(err.code(), "malformed");
    }

    #[test]
    fn rejects_a_lowercase_room_code() {
        let frame = r#"{"type":"start","code":"00ffaa"}"#;
        let err = ClientCommand::from_json_str(frame).unwrap_err();
        assert_eq!(err.code(), "malformed");
    }

    #[test]
    fn error_frames_carry_the_failure_code() {
        let err = ServiceError::NotFound("room `00FFAA` not found".to_string());
        let message = ServerMessage::error(Some(CommandKind::Join), &err);
        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains(r#""type":"error""#));
        assert!(json.contains(r#""command":"join""#));
        assert!(json.contains(r#""code":"not_found""#));
    }
}
