//! End-to-end completion flow against a real data root.

use std::sync::Arc;

use chrono::{Duration, Local, TimeZone};
use deepwork_core::{
    Choice, CompletionState, DeepWorkEngine, ManualClock, MusicChoice, PendingDecision,
    SessionPlan, StorageConfig, ROUTE_HOME, SAVE_RETRY_BUDGET,
};
use tempfile::{tempdir, TempDir};

fn engine() -> (TempDir, Arc<ManualClock>, DeepWorkEngine) {
    let temp = tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(
        Local.with_ymd_and_hms(2024, 2, 15, 23, 50, 0).unwrap(),
    ));
    let engine = DeepWorkEngine::with_storage(
        StorageConfig::with_root(temp.path().to_path_buf()),
        clock.clone(),
    )
    .unwrap();
    (temp, clock, engine)
}

fn plan(minutes: u32) -> SessionPlan {
    SessionPlan {
        duration_minutes: minutes,
        activity: "write".to_string(),
        music_choice: MusicChoice::Lofi,
    }
}

#[test]
fn test_finished_session_is_recorded_on_completion_day() {
    let (_temp, clock, engine) = engine();
    let mut session = engine.start_session(plan(20)).unwrap();

    // Poll ticks are irregular; only wall time matters.
    clock.advance(Duration::minutes(7));
    assert!(!session.poll());
    clock.advance(Duration::minutes(13));
    assert!(session.poll());

    session.submit_notes("draft chapter two").unwrap();
    assert_eq!(
        session.save(engine.sessions()).unwrap(),
        CompletionState::Completed
    );

    // Started before midnight, finished after: keyed by the completion day.
    let saved = session.saved_session().unwrap().clone();
    assert_eq!(saved.date, "2024-02-16");
    assert_eq!(saved.duration, 20);
    assert_eq!(saved.music_choice, MusicChoice::Lofi);
    assert_eq!(engine.sessions().get_sessions_by_date("2024-02-16"), vec![saved]);

    assert_eq!(session.resolve(Choice::NewSession).unwrap(), Some(ROUTE_HOME));
}

#[test]
fn test_save_failure_on_damaged_store_then_repair_and_retry() {
    let (temp, clock, engine) = engine();
    let mut session = engine.start_session(plan(10)).unwrap();
    clock.advance(Duration::minutes(10));
    assert!(session.poll());
    session.submit_notes("").unwrap();

    fs_err::write(temp.path().join("sessions.json"), "{\"2024-02-15\": 7}").unwrap();
    assert_eq!(
        session.save(engine.sessions()).unwrap(),
        CompletionState::Failed
    );
    match session.pending().unwrap() {
        PendingDecision::SaveFailed {
            attempts,
            retry_allowed,
            ..
        } => {
            assert_eq!(*attempts, 1);
            assert!(*retry_allowed);
        }
        other => panic!("unexpected pending decision: {:?}", other),
    }
    assert_eq!(
        fs_err::read_to_string(temp.path().join("sessions.json")).unwrap(),
        "{\"2024-02-15\": 7}"
    );

    engine.health(true).unwrap();
    session.resolve(Choice::Retry).unwrap();
    assert_eq!(
        session.save(engine.sessions()).unwrap(),
        CompletionState::Completed
    );
    assert_eq!(engine.sessions().get_sessions().session_count(), 1);
}

#[test]
fn test_exhausted_retries_write_nothing() {
    let (temp, clock, engine) = engine();
    fs_err::write(temp.path().join("sessions.json"), "not json").unwrap();

    let mut session = engine.start_session(plan(10)).unwrap();
    clock.advance(Duration::minutes(10));
    session.poll();
    session.submit_notes("").unwrap();

    for attempt in 1..=SAVE_RETRY_BUDGET {
        assert_eq!(
            session.save(engine.sessions()).unwrap(),
            CompletionState::Failed
        );
        if attempt < SAVE_RETRY_BUDGET {
            session.resolve(Choice::Retry).unwrap();
        }
    }

    assert!(session.resolve(Choice::Retry).is_err());
    session.resolve(Choice::Abandon).unwrap();
    assert_eq!(session.state(), CompletionState::Abandoned);
    assert_eq!(
        fs_err::read_to_string(temp.path().join("sessions.json")).unwrap(),
        "not json"
    );
}

#[test]
fn test_early_end_records_nothing() {
    let (temp, clock, engine) = engine();
    let mut session = engine.start_session(plan(30)).unwrap();
    clock.advance(Duration::minutes(12));

    session.request_end().unwrap();
    session.resolve(Choice::EndSession).unwrap();

    assert_eq!(session.state(), CompletionState::Abandoned);
    assert!(!temp.path().join("sessions.json").exists());
}
