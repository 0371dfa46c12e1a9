use tokio::sync::broadcast;
use tracing::info;

use crate::{
    dto::{
        battle::{JoinedPayload, RoomSummary},
        ws::{
            AdvanceCommand, AnswerCommand, CreateCommand, JoinCommand, StartCommand,
            UpdateSettingsCommand,
        },
    },
    error::ServiceError,
    services::room_events,
    state::{
        ConnectionId, SharedState,
        hub::RoomEvent,
        room::{AdvanceOutcome, LeaveOutcome, Question, Room, RoomPhase},
    },
};

/// Open a new room with the caller seated as host.
///
/// Returns the allocated code together with the caller's subscription to the
/// room's event stream; the initial roster broadcast is already queued on it.
pub async fn create_room(
    state: &SharedState,
    conn: ConnectionId,
    command: CreateCommand,
) -> Result<(String, broadcast::Receiver<RoomEvent>), ServiceError> {
    let mut settings = state.config().default_settings().clone();
    if let Some(patch) = &command.settings {
        settings = settings.merged(patch);
    }

    let slot = state
        .rooms()
        .create(&command.quiz_id, conn, &command.name, settings);
    let room = slot.room().lock().await;
    let receiver = slot.events().subscribe();
    room_events::broadcast_lobby(&slot, &room);
    Ok((slot.code().to_string(), receiver))
}

/// Seat the caller in an existing lobby.
///
/// Returns the direct acknowledgement payload together with the caller's
/// subscription to the room's event stream; the roster broadcast reflecting
/// the join is already queued on it.
pub async fn join_room(
    state: &SharedState,
    conn: ConnectionId,
    command: JoinCommand,
) -> Result<(JoinedPayload, broadcast::Receiver<RoomEvent>), ServiceError> {
    let slot = state
        .rooms()
        .get(&command.code)
        .ok_or_else(|| room_not_found(&command.code))?;
    let mut room = slot.room().lock().await;
    ensure_live(&room, &command.code)?;

    room.join(conn, command.name)?;
    let receiver = slot.events().subscribe();
    room_events::broadcast_lobby(&slot, &room);

    let payload = JoinedPayload {
        code: command.code,
        quiz_id: room.quiz_id().to_string(),
        host: room.host(),
        settings: room.settings().clone(),
    };
    Ok((payload, receiver))
}

/// Merge a settings patch into a lobby; host-only.
pub async fn update_settings(
    state: &SharedState,
    conn: ConnectionId,
    command: UpdateSettingsCommand,
) -> Result<(), ServiceError> {
    let slot = state
        .rooms()
        .get(&command.code)
        .ok_or_else(|| room_not_found(&command.code))?;
    let mut room = slot.room().lock().await;
    ensure_live(&room, &command.code)?;

    room.update_settings(conn, &command.settings)?;
    room_events::broadcast_lobby(&slot, &room);
    Ok(())
}

/// Launch a lobby's battle; host-only.
///
/// Questions are fetched from the quiz catalog outside the room lock, then
/// the start is applied and broadcast in one critical section. The phase and
/// authority checks run again on apply, so anything that changed during the
/// fetch is caught.
pub async fn start_battle(
    state: &SharedState,
    conn: ConnectionId,
    command: StartCommand,
) -> Result<(), ServiceError> {
    let slot = state
        .rooms()
        .get(&command.code)
        .ok_or_else(|| room_not_found(&command.code))?;
    let quiz_id = {
        let room = slot.room().lock().await;
        ensure_live(&room, &command.code)?;
        room.quiz_id().to_string()
    };

    let entities = state.quizzes().fetch_questions(&quiz_id).await?;
    let questions: Vec<Question> = entities.into_iter().map(Question::from).collect();

    let mut room = slot.room().lock().await;
    ensure_live(&room, &command.code)?;
    let start_at = room.start(conn, questions, state.config().start_lead())?;
    room_events::broadcast_begin(&slot, &room, start_at);
    info!(code = %command.code, quiz_id = %quiz_id, start_at, "battle started");
    Ok(())
}

/// Record the caller's answer for a question of a running battle.
///
/// Scoring is applied immediately when the answer is correct and the pair has
/// not been credited yet; every recorded answer rebroadcasts the progress
/// snapshot so the room watches scores move in real time.
pub async fn submit_answer(
    state: &SharedState,
    conn: ConnectionId,
    command: AnswerCommand,
) -> Result<(), ServiceError> {
    let slot = state
        .rooms()
        .get(&command.code)
        .ok_or_else(|| room_not_found(&command.code))?;
    let mut room = slot.room().lock().await;
    ensure_live(&room, &command.code)?;

    room.submit_answer(conn, &command.question_id, command.selected_option)?;
    room_events::broadcast_progress(&slot, &room);
    Ok(())
}

/// Move a battle to the next question; host-only.
///
/// Completion tears the room down: the final leaderboard is broadcast and the
/// code is released.
pub async fn advance_battle(
    state: &SharedState,
    conn: ConnectionId,
    command: AdvanceCommand,
) -> Result<(), ServiceError> {
    let slot = state
        .rooms()
        .get(&command.code)
        .ok_or_else(|| room_not_found(&command.code))?;
    let mut room = slot.room().lock().await;
    ensure_live(&room, &command.code)?;

    match room.advance(conn, command.correct_answer_overrides.as_ref())? {
        AdvanceOutcome::Progress => room_events::broadcast_progress(&slot, &room),
        AdvanceOutcome::Finished(leaderboard) => {
            room_events::broadcast_finish(&slot, leaderboard);
            drop(room);
            state.rooms().remove(&command.code);
        }
    }
    Ok(())
}

/// Remove a connection from the room it is bound to, typically on disconnect.
///
/// Departures rebroadcast the phase-appropriate roster snapshot; a departing
/// host hands authority to the earliest-joined remaining player, and the last
/// departure releases the code.
pub async fn leave_room(state: &SharedState, conn: ConnectionId, code: &str) {
    let Some(slot) = state.rooms().get(code) else {
        return;
    };
    let mut room = slot.room().lock().await;

    match room.leave(conn) {
        LeaveOutcome::NotMember => {}
        LeaveOutcome::Left { new_host, now_empty } => {
            if now_empty {
                drop(room);
                state.rooms().remove(code);
                return;
            }
            if let Some(host) = new_host {
                room_events::broadcast_host_changed(&slot, host);
            }
            match room.phase() {
                RoomPhase::Lobby => room_events::broadcast_lobby(&slot, &room),
                RoomPhase::InProgress => room_events::broadcast_progress(&slot, &room),
                RoomPhase::Finished => {}
            }
        }
    }
}

/// Read-only snapshot of a live room, served over HTTP.
pub async fn room_summary(state: &SharedState, code: &str) -> Result<RoomSummary, ServiceError> {
    let slot = state
        .rooms()
        .get(code)
        .ok_or_else(|| room_not_found(code))?;
    let room = slot.room().lock().await;
    ensure_live(&room, code)?;
    Ok(RoomSummary::of(&room))
}

fn room_not_found(code: &str) -> ServiceError {
    ServiceError::NotFound(format!("room `{code}` not found"))
}

/// Commands addressed to a finished or emptied room behave as if the room
/// were already gone; teardown races are collapsed into a single observable
/// outcome. A registered room always seats at least its creator, so an empty
/// roster means the last departure already tore the room down.
fn ensure_live(room: &Room, code: &str) -> Result<(), ServiceError> {
    if room.phase() == RoomPhase::Finished || room.players().is_empty() {
        return Err(room_not_found(code));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::{QuestionEntity, QuizEntity},
            quiz_store::static_store::StaticQuizStore,
            room_store::memory::MemoryRoomStore,
        },
        state::{AppState, room::SettingsPatch},
    };

    fn sample_quiz() -> QuizEntity {
        QuizEntity {
            id: "capitals".to_string(),
            title: "Capital cities".to_string(),
            questions: vec![
                QuestionEntity {
                    id: "q1".to_string(),
                    question: "Capital of France?".to_string(),
                    options: vec!["Paris".to_string(), "Rome".to_string(), "Berlin".to_string()],
                    correct_answer: 0,
                    points: Some(2),
                },
                QuestionEntity {
                    id: "q2".to_string(),
                    question: "Capital of Japan?".to_string(),
                    options: vec!["Kyoto".to_string(), "Tokyo".to_string()],
                    correct_answer: 1,
                    points: None,
                },
            ],
        }
    }

    fn test_state() -> SharedState {
        let quizzes = StaticQuizStore::from_quizzes(vec![sample_quiz()]);
        AppState::new(
            AppConfig::default(),
            Arc::new(quizzes),
            Arc::new(MemoryRoomStore::new()),
        )
    }

    fn create_command(name: &str) -> CreateCommand {
        CreateCommand {
            quiz_id: "capitals".to_string(),
            name: name.to_string(),
            settings: None,
        }
    }

    fn join_command(code: &str, name: &str) -> JoinCommand {
        JoinCommand {
            code: code.to_string(),
            name: name.to_string(),
        }
    }

    async fn next_event(rx: &mut broadcast::Receiver<RoomEvent>) -> RoomEvent {
        rx.recv().await.expect("room event")
    }

    fn parse(event: &RoomEvent) -> serde_json::Value {
        serde_json::from_str(&event.json).expect("event payload is json")
    }

    #[tokio::test]
    async fn creating_a_room_broadcasts_the_initial_roster() {
        let state = test_state();
        let host = Uuid::new_v4();

        let (code, mut rx) = create_room(&state, host, create_command("Ada"))
            .await
            .unwrap();

        assert_eq!(code.len(), 6);
        assert_eq!(state.rooms().active_rooms(), 1);

        let event = next_event(&mut rx).await;
        assert_eq!(event.name, "lobby");
        let value = parse(&event);
        assert_eq!(value["code"], code.as_str());
        assert_eq!(value["players"][host.to_string()]["name"], "Ada");
    }

    #[tokio::test]
    async fn joining_notifies_every_subscriber() {
        let state = test_state();
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();

        let (code, mut host_rx) = create_room(&state, host, create_command("Ada"))
            .await
            .unwrap();
        let (payload, _guest_rx) = join_room(&state, guest, join_command(&code, "Bea"))
            .await
            .unwrap();

        assert_eq!(payload.code, code);
        assert_eq!(payload.host, host);

        let _creation = next_event(&mut host_rx).await;
        let event = next_event(&mut host_rx).await;
        assert_eq!(event.name, "lobby");
        let value = parse(&event);
        assert_eq!(value["players"][guest.to_string()]["name"], "Bea");
    }

    #[tokio::test]
    async fn joining_an_unknown_code_is_not_found() {
        let state = test_state();

        let err = join_room(&state, Uuid::new_v4(), join_command("0A0A0A", "Bea"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[tokio::test]
    async fn a_full_battle_awards_points_and_tears_the_room_down() {
        let state = test_state();
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();

        let (code, mut host_rx) = create_room(&state, host, create_command("Ada"))
            .await
            .unwrap();
        join_room(&state, guest, join_command(&code, "Bea"))
            .await
            .unwrap();
        start_battle(&state, host, StartCommand { code: code.clone() })
            .await
            .unwrap();

        // two lobby snapshots precede the kick-off
        let _creation = next_event(&mut host_rx).await;
        let _join = next_event(&mut host_rx).await;
        let begin = next_event(&mut host_rx).await;
        assert_eq!(begin.name, "begin");
        let value = parse(&begin);
        assert!(value["start_at"].as_u64().is_some());
        assert_eq!(value["questions"].as_array().map(Vec::len), Some(2));
        assert!(!begin.json.contains("correct_answer"));

        // host gets q1 right, guest picks a wrong option
        submit_answer(
            &state,
            host,
            AnswerCommand {
                code: code.clone(),
                question_id: "q1".to_string(),
                selected_option: 0,
            },
        )
        .await
        .unwrap();
        submit_answer(
            &state,
            guest,
            AnswerCommand {
                code: code.clone(),
                question_id: "q1".to_string(),
                selected_option: 1,
            },
        )
        .await
        .unwrap();

        // each answer refreshed the progress snapshot
        let scored = next_event(&mut host_rx).await;
        assert_eq!(scored.name, "progress");
        let value = parse(&scored);
        assert_eq!(value["index"], 0);
        assert_eq!(value["players"][host.to_string()]["score"], 2);
        let _guest_answer = next_event(&mut host_rx).await;

        advance_battle(
            &state,
            host,
            AdvanceCommand {
                code: code.clone(),
                correct_answer_overrides: None,
            },
        )
        .await
        .unwrap();

        let progress = next_event(&mut host_rx).await;
        assert_eq!(progress.name, "progress");
        let value = parse(&progress);
        assert_eq!(value["index"], 1);
        assert_eq!(value["players"][host.to_string()]["score"], 2);
        assert_eq!(value["players"][guest.to_string()]["score"], 0);

        submit_answer(
            &state,
            guest,
            AnswerCommand {
                code: code.clone(),
                question_id: "q2".to_string(),
                selected_option: 1,
            },
        )
        .await
        .unwrap();
        let _final_answer = next_event(&mut host_rx).await;

        advance_battle(
            &state,
            host,
            AdvanceCommand {
                code: code.clone(),
                correct_answer_overrides: None,
            },
        )
        .await
        .unwrap();

        let finish = next_event(&mut host_rx).await;
        assert_eq!(finish.name, "finish");
        let value = parse(&finish);
        assert_eq!(value["leaderboard"][0]["name"], "Ada");
        assert_eq!(value["leaderboard"][0]["score"], 2);
        assert_eq!(value["leaderboard"][1]["name"], "Bea");
        assert_eq!(value["leaderboard"][1]["score"], 1);
        assert_eq!(state.rooms().active_rooms(), 0);
    }

    #[tokio::test]
    async fn only_the_host_may_start_and_nothing_is_broadcast() {
        let state = test_state();
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();

        let (code, mut host_rx) = create_room(&state, host, create_command("Ada"))
            .await
            .unwrap();
        join_room(&state, guest, join_command(&code, "Bea"))
            .await
            .unwrap();
        let _creation = next_event(&mut host_rx).await;
        let _join = next_event(&mut host_rx).await;

        let err = start_battle(&state, guest, StartCommand { code: code.clone() })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "unauthorized");
        assert!(host_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn settings_updates_rebroadcast_the_lobby() {
        let state = test_state();
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();

        let (code, mut host_rx) = create_room(&state, host, create_command("Ada"))
            .await
            .unwrap();
        let _creation = next_event(&mut host_rx).await;

        update_settings(
            &state,
            host,
            UpdateSettingsCommand {
                code: code.clone(),
                settings: SettingsPatch {
                    max_players: Some(3),
                    ..SettingsPatch::default()
                },
            },
        )
        .await
        .unwrap();

        let event = next_event(&mut host_rx).await;
        assert_eq!(event.name, "lobby");
        assert_eq!(parse(&event)["settings"]["max_players"], 3);

        join_room(&state, guest, join_command(&code, "Bea"))
            .await
            .unwrap();
        let err = update_settings(
            &state,
            guest,
            UpdateSettingsCommand {
                code,
                settings: SettingsPatch::default(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), "unauthorized");
    }

    #[tokio::test]
    async fn starting_an_unknown_quiz_keeps_the_lobby_open() {
        let state = test_state();
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();

        let (code, _host_rx) = create_room(
            &state,
            host,
            CreateCommand {
                quiz_id: "ghost".to_string(),
                name: "Ada".to_string(),
                settings: None,
            },
        )
        .await
        .unwrap();

        let err = start_battle(&state, host, StartCommand { code: code.clone() })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "not_found");

        // the room is untouched and still accepts players
        join_room(&state, guest, join_command(&code, "Bea"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn answers_are_rejected_while_in_the_lobby() {
        let state = test_state();
        let host = Uuid::new_v4();

        let (code, _host_rx) = create_room(&state, host, create_command("Ada"))
            .await
            .unwrap();
        let err = submit_answer(
            &state,
            host,
            AnswerCommand {
                code,
                question_id: "q1".to_string(),
                selected_option: 0,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), "invalid_state");
    }

    #[tokio::test]
    async fn every_recorded_answer_broadcasts_progress() {
        let state = test_state();
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();

        let (code, mut host_rx) = create_room(&state, host, create_command("Ada"))
            .await
            .unwrap();
        join_room(&state, guest, join_command(&code, "Bea"))
            .await
            .unwrap();
        start_battle(&state, host, StartCommand { code: code.clone() })
            .await
            .unwrap();
        let _creation = next_event(&mut host_rx).await;
        let _join = next_event(&mut host_rx).await;
        let _begin = next_event(&mut host_rx).await;

        submit_answer(
            &state,
            guest,
            AnswerCommand {
                code: code.clone(),
                question_id: "q1".to_string(),
                selected_option: 0,
            },
        )
        .await
        .unwrap();

        let event = next_event(&mut host_rx).await;
        assert_eq!(event.name, "progress");
        let value = parse(&event);
        assert_eq!(value["index"], 0);
        assert_eq!(value["players"][guest.to_string()]["score"], 2);

        // wrong picks rebroadcast too, scores unchanged
        submit_answer(
            &state,
            host,
            AnswerCommand {
                code,
                question_id: "q1".to_string(),
                selected_option: 1,
            },
        )
        .await
        .unwrap();

        let event = next_event(&mut host_rx).await;
        assert_eq!(event.name, "progress");
        assert_eq!(parse(&event)["players"][host.to_string()]["score"], 0);
    }

    #[tokio::test]
    async fn a_departing_host_hands_authority_to_the_next_player() {
        let state = test_state();
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();

        let (code, _host_rx) = create_room(&state, host, create_command("Ada"))
            .await
            .unwrap();
        let (_, mut guest_rx) = join_room(&state, guest, join_command(&code, "Bea"))
            .await
            .unwrap();
        let _join = next_event(&mut guest_rx).await;

        leave_room(&state, host, &code).await;

        let event = next_event(&mut guest_rx).await;
        assert_eq!(event.name, "host_changed");
        assert_eq!(parse(&event)["host"], guest.to_string());

        let roster = next_event(&mut guest_rx).await;
        assert_eq!(roster.name, "lobby");
        let value = parse(&roster);
        assert!(value["players"][host.to_string()].is_null());
        assert_eq!(state.rooms().active_rooms(), 1);
    }

    #[tokio::test]
    async fn a_join_racing_the_final_departure_is_not_found() {
        let state = test_state();
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();

        let (code, _host_rx) = create_room(&state, host, create_command("Ada"))
            .await
            .unwrap();
        let slot = state.rooms().get(&code).unwrap();

        // hold the room lock so the departure and the join queue behind it in order
        let room = slot.room().lock().await;

        let leave_state = state.clone();
        let leave_code = code.clone();
        let leaving = tokio::spawn(async move {
            leave_room(&leave_state, host, &leave_code).await;
        });
        tokio::task::yield_now().await;

        let join_state = state.clone();
        let join_code = code.clone();
        let joining = tokio::spawn(async move {
            join_room(&join_state, guest, join_command(&join_code, "Bea")).await
        });
        tokio::task::yield_now().await;

        drop(room);
        leaving.await.unwrap();
        let err = joining.await.unwrap().unwrap_err();

        assert_eq!(err.code(), "not_found");
        assert_eq!(state.rooms().active_rooms(), 0);
    }

    #[tokio::test]
    async fn the_last_departure_releases_the_code() {
        let state = test_state();
        let host = Uuid::new_v4();

        let (code, _host_rx) = create_room(&state, host, create_command("Ada"))
            .await
            .unwrap();
        leave_room(&state, host, &code).await;

        assert_eq!(state.rooms().active_rooms(), 0);
        assert_eq!(
            room_summary(&state, &code).await.unwrap_err().code(),
            "not_found"
        );
    }

    #[tokio::test]
    async fn summaries_never_leak_answer_keys() {
        let state = test_state();
        let host = Uuid::new_v4();

        let (code, _host_rx) = create_room(&state, host, create_command("Ada"))
            .await
            .unwrap();
        let summary = room_summary(&state, &code).await.unwrap();
        assert_eq!(summary.phase, "lobby");

        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("correct_answer"));
    }
}
