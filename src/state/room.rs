use std::collections::{HashMap, HashSet};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dao::models::QuestionEntity;

/// Identifier assigned to every live connection at socket upgrade.
pub type ConnectionId = Uuid;

/// Display name given to seats reserved by a client that has not picked a name
/// yet. A room at capacity may evict one such seat to let the same client
/// rejoin under its real name.
pub const PLACEHOLDER_NAME: &str = "Player";

/// High-level phase of a battle room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    /// Pre-start: players join and the host may adjust settings.
    Lobby,
    /// Questions are live; answers are accepted and the host paces progression.
    InProgress,
    /// Terminal: the leaderboard has been produced, the room is being torn down.
    Finished,
}

/// Tunable parameters of a battle, fixed per room once started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BattleSettings {
    /// Seconds clients give players for each question.
    pub quiz_time_seconds: u32,
    /// Upper bound on the number of questions played (0 = whole quiz).
    pub num_questions: u32,
    /// Maximum number of players in the room, host included.
    pub max_players: u32,
}

impl BattleSettings {
    /// Apply a patch, keeping the current value for absent or zero fields.
    pub fn merged(mut self, patch: &SettingsPatch) -> Self {
        if let Some(value) = patch.quiz_time_seconds.filter(|v| *v > 0) {
            self.quiz_time_seconds = value;
        }
        if let Some(value) = patch.num_questions.filter(|v| *v > 0) {
            self.num_questions = value;
        }
        if let Some(value) = patch.max_players.filter(|v| *v > 0) {
            self.max_players = value;
        }
        self
    }
}

/// Partial settings update; absent or zero fields keep their prior value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SettingsPatch {
    /// New per-question time budget in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_time_seconds: Option<u32>,
    /// New question count bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_questions: Option<u32>,
    /// New player capacity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_players: Option<u32>,
}

/// A participant in a battle room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Player {
    /// Display name shown in snapshots and the leaderboard.
    pub name: String,
    /// Accumulated score; never decreases for the lifetime of the room.
    pub score: u32,
}

/// Server-authoritative question, including the answer key.
///
/// Never serialized to clients; snapshots carry the stripped projection built
/// in the DTO layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Stable identifier within the quiz.
    pub id: String,
    /// Question text.
    pub question: String,
    /// Answer options in display order.
    pub options: Vec<String>,
    /// Index into `options` of the correct answer.
    pub correct_answer: usize,
    /// Points credited for a correct answer.
    pub points: u32,
}

impl From<QuestionEntity> for Question {
    fn from(entity: QuestionEntity) -> Self {
        Self {
            id: entity.id,
            question: entity.question,
            options: entity.options,
            correct_answer: entity.correct_answer,
            points: entity.points.unwrap_or(1),
        }
    }
}

/// Leaderboard line produced when a battle finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ScoreEntry {
    /// Player display name.
    pub name: String,
    /// Final score.
    pub score: u32,
}

/// Error returned when a room operation cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    /// A host-only operation was invoked by another connection.
    #[error("only the host can {0}")]
    NotHost(&'static str),
    /// The caller is not (or no longer) a member of this room.
    #[error("not a member of this room")]
    NotMember,
    /// The room is at capacity and no placeholder seat can be reclaimed.
    #[error("room is full")]
    Full,
    /// The operation is not valid in the room's current phase.
    #[error("cannot {action} while the room is {phase:?}")]
    WrongPhase {
        /// Operation that was attempted.
        action: &'static str,
        /// Phase the room was in.
        phase: RoomPhase,
    },
    /// The submitted question id does not exist in this battle.
    #[error("unknown question `{0}`")]
    UnknownQuestion(String),
    /// The selected option index is outside the question's option list.
    #[error("option {selected} is out of range (question has {options} options)")]
    OptionOutOfRange {
        /// Index the player selected.
        selected: usize,
        /// Number of options the question offers.
        options: usize,
    },
}

/// Outcome of a host `advance` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// Moved to the next question; broadcast progress.
    Progress,
    /// The battle completed; carries the final leaderboard, score descending.
    Finished(Vec<ScoreEntry>),
}

/// Outcome of removing a connection from a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The connection was not a member; nothing changed.
    NotMember,
    /// The member was removed.
    Left {
        /// Set when the departing member was the host and authority moved to
        /// the earliest-joined remaining player.
        new_host: Option<ConnectionId>,
        /// True when no members remain and the room should be torn down.
        now_empty: bool,
    },
}

/// Per-battle state machine: roster, settings, question progression, scoring.
///
/// All mutation happens under the owning slot's mutex; methods validate phase
/// and authority and return typed errors instead of mutating on bad input.
#[derive(Debug)]
pub struct Room {
    code: String,
    quiz_id: String,
    host: ConnectionId,
    players: IndexMap<ConnectionId, Player>,
    settings: BattleSettings,
    started: bool,
    finished: bool,
    current_index: usize,
    questions: Vec<Question>,
    /// Latest recorded selection per (player, question id).
    answers: HashMap<(ConnectionId, String), usize>,
    /// Pairs already credited; consulted by both scoring paths so points are
    /// awarded at most once no matter how often a pair is evaluated.
    awarded: HashSet<(ConnectionId, String)>,
    created_at: SystemTime,
}

impl Room {
    /// Create a room in the lobby phase with the creator as host and sole player.
    pub fn new(
        code: String,
        quiz_id: String,
        host: ConnectionId,
        host_name: String,
        settings: BattleSettings,
    ) -> Self {
        let mut players = IndexMap::new();
        players.insert(
            host,
            Player {
                name: host_name,
                score: 0,
            },
        );
        Self {
            code,
            quiz_id,
            host,
            players,
            settings,
            started: false,
            finished: false,
            current_index: 0,
            questions: Vec::new(),
            answers: HashMap::new(),
            awarded: HashSet::new(),
            created_at: SystemTime::now(),
        }
    }

    /// Shareable room code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Identifier of the quiz this battle plays.
    pub fn quiz_id(&self) -> &str {
        &self.quiz_id
    }

    /// Connection currently holding host authority.
    pub fn host(&self) -> ConnectionId {
        self.host
    }

    /// Roster in join order.
    pub fn players(&self) -> &IndexMap<ConnectionId, Player> {
        &self.players
    }

    /// Current settings.
    pub fn settings(&self) -> &BattleSettings {
        &self.settings
    }

    /// Materialized questions (empty until the battle starts).
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Index of the question currently being played.
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Creation timestamp, echoed in lobby snapshots.
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Derive the current phase from the lifecycle flags.
    pub fn phase(&self) -> RoomPhase {
        if self.finished {
            RoomPhase::Finished
        } else if !self.started {
            RoomPhase::Lobby
        } else {
            RoomPhase::InProgress
        }
    }

    /// Latest selection this connection recorded for a question, if any.
    pub fn recorded_answer(&self, conn: ConnectionId, question_id: &str) -> Option<usize> {
        self.answers.get(&(conn, question_id.to_string())).copied()
    }

    /// Add a player to the lobby.
    ///
    /// A name collision with a different connection evicts the stale entry
    /// first. At capacity, the first non-host placeholder seat is reclaimed;
    /// otherwise the join is rejected.
    pub fn join(&mut self, conn: ConnectionId, name: String) -> Result<(), RoomError> {
        let phase = self.phase();
        if phase != RoomPhase::Lobby {
            return Err(RoomError::WrongPhase {
                action: "join",
                phase,
            });
        }

        let stale = self
            .players
            .iter()
            .find(|(id, player)| **id != conn && player.name == name)
            .map(|(id, _)| *id);
        if let Some(stale) = stale {
            self.players.shift_remove(&stale);
        }

        if self.players.len() >= self.settings.max_players as usize {
            let placeholder = self
                .players
                .iter()
                .find(|(id, player)| **id != self.host && player.name == PLACEHOLDER_NAME)
                .map(|(id, _)| *id);
            match placeholder {
                Some(id) => {
                    self.players.shift_remove(&id);
                }
                None => return Err(RoomError::Full),
            }
        }

        self.players.insert(conn, Player { name, score: 0 });
        Ok(())
    }

    /// Merge a settings patch; host-only, lobby-only. Zero values are ignored.
    pub fn update_settings(
        &mut self,
        conn: ConnectionId,
        patch: &SettingsPatch,
    ) -> Result<(), RoomError> {
        if conn != self.host {
            return Err(RoomError::NotHost("update settings"));
        }
        let phase = self.phase();
        if phase != RoomPhase::Lobby {
            return Err(RoomError::WrongPhase {
                action: "update settings",
                phase,
            });
        }

        self.settings = self.settings.clone().merged(patch);
        Ok(())
    }

    /// Begin the battle with the materialized question list; host-only,
    /// lobby-only.
    ///
    /// The list is truncated to `num_questions` when that bound is set.
    /// Returns the synchronized start instant as epoch milliseconds, computed
    /// as now plus `start_lead` so clients can align their timers.
    pub fn start(
        &mut self,
        conn: ConnectionId,
        mut questions: Vec<Question>,
        start_lead: Duration,
    ) -> Result<u64, RoomError> {
        if conn != self.host {
            return Err(RoomError::NotHost("start the battle"));
        }
        let phase = self.phase();
        if phase != RoomPhase::Lobby {
            return Err(RoomError::WrongPhase {
                action: "start",
                phase,
            });
        }

        if self.settings.num_questions > 0 {
            questions.truncate(self.settings.num_questions as usize);
        }
        self.questions = questions;
        self.current_index = 0;
        self.started = true;

        let now = UNIX_EPOCH.elapsed().unwrap_or_default();
        Ok((now + start_lead).as_millis() as u64)
    }

    /// Record an answer for the given question and credit points when it is
    /// correct and the (player, question) pair has not been credited yet.
    ///
    /// Re-submissions replace the stored selection but never re-award or
    /// revoke points.
    pub fn submit_answer(
        &mut self,
        conn: ConnectionId,
        question_id: &str,
        selected: usize,
    ) -> Result<(), RoomError> {
        if !self.players.contains_key(&conn) {
            return Err(RoomError::NotMember);
        }
        let phase = self.phase();
        if phase != RoomPhase::InProgress {
            return Err(RoomError::WrongPhase {
                action: "answer",
                phase,
            });
        }

        let Some(question) = self.questions.iter().find(|q| q.id == question_id) else {
            return Err(RoomError::UnknownQuestion(question_id.to_string()));
        };
        let option_count = question.options.len();
        let correct = question.correct_answer;
        let points = question.points;
        if selected >= option_count {
            return Err(RoomError::OptionOutOfRange {
                selected,
                options: option_count,
            });
        }

        let key = (conn, question_id.to_string());
        self.answers.insert(key.clone(), selected);

        if selected == correct && !self.awarded.contains(&key) {
            self.awarded.insert(key);
            if let Some(player) = self.players.get_mut(&conn) {
                player.score += points;
            }
        }
        Ok(())
    }

    /// Move to the next question; host-only, in-progress only.
    ///
    /// Before advancing, runs a reconciliation pass over the current question:
    /// every member whose recorded answer matches the authoritative (or
    /// overridden) correct answer and who has not been credited yet is
    /// credited now. When the index reaches the end of the question list the
    /// room finishes and the leaderboard is returned.
    pub fn advance(
        &mut self,
        conn: ConnectionId,
        overrides: Option<&HashMap<String, usize>>,
    ) -> Result<AdvanceOutcome, RoomError> {
        if conn != self.host {
            return Err(RoomError::NotHost("advance the battle"));
        }
        let phase = self.phase();
        if phase != RoomPhase::InProgress {
            return Err(RoomError::WrongPhase {
                action: "advance",
                phase,
            });
        }

        if let Some(question) = self.questions.get(self.current_index) {
            let question_id = question.id.clone();
            let points = question.points;
            let correct = overrides
                .and_then(|map| map.get(&question_id))
                .copied()
                .unwrap_or(question.correct_answer);

            let members: Vec<ConnectionId> = self.players.keys().copied().collect();
            for member in members {
                let key = (member, question_id.clone());
                if self.awarded.contains(&key) {
                    continue;
                }
                if self.answers.get(&key) == Some(&correct) {
                    self.awarded.insert(key);
                    if let Some(player) = self.players.get_mut(&member) {
                        player.score += points;
                    }
                }
            }
            self.current_index += 1;
        }

        if self.current_index >= self.questions.len() {
            self.finished = true;
            return Ok(AdvanceOutcome::Finished(self.leaderboard()));
        }
        Ok(AdvanceOutcome::Progress)
    }

    /// Remove a connection from the roster, transferring host authority to the
    /// earliest-joined remaining player when the host departs.
    pub fn leave(&mut self, conn: ConnectionId) -> LeaveOutcome {
        if self.players.shift_remove(&conn).is_none() {
            return LeaveOutcome::NotMember;
        }
        if self.players.is_empty() {
            return LeaveOutcome::Left {
                new_host: None,
                now_empty: true,
            };
        }
        let mut new_host = None;
        if conn == self.host {
            if let Some(next) = self.players.keys().next().copied() {
                self.host = next;
                new_host = Some(next);
            }
        }
        LeaveOutcome::Left {
            new_host,
            now_empty: false,
        }
    }

    /// Current standings, score descending; join order breaks ties.
    pub fn leaderboard(&self) -> Vec<ScoreEntry> {
        let mut entries: Vec<ScoreEntry> = self
            .players
            .values()
            .map(|player| ScoreEntry {
                name: player.name.clone(),
                score: player.score,
            })
            .collect();
        entries.sort_by(|a, b| b.score.cmp(&a.score));
        entries
    }
}
