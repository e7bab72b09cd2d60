use super::*;
use crate::classify::UNKNOWN_TABLE;
use crate::clock::ManualClock;
use serde_json::json;

fn manual_session(config: CaptureConfig) -> (Arc<ManualClock>, CaptureSession) {
    let clock = Arc::new(ManualClock::default());
    let session = CaptureSession::with_clock(config, clock.clone());
    (clock, session)
}

// ── Lifecycle ──

#[test]
fn test_new_session_is_active_and_empty() {
    let session = CaptureSession::new();
    assert_eq!(session.state(), SessionState::Active);
    assert!(session.finished_at().is_none());
    assert_eq!(session.statement_count(), 0);
    assert!(session.total_duration().is_none());
}

#[test]
fn test_finish_twice_fails() {
    let (_, mut session) = manual_session(CaptureConfig::default());
    session.finish().unwrap();
    assert!(session.is_finished());

    let err = session.finish().unwrap_err();
    assert!(matches!(err, CaptureError::AlreadyFinished));
    assert!(err.is_lifecycle());
}

#[test]
fn test_statement_after_finish_is_rejected() {
    let (_, mut session) = manual_session(CaptureConfig::default());
    session.on_statement("SELECT 1", Parameters::none(), false).unwrap();
    session.finish().unwrap();

    let err = session
        .on_statement("SELECT 2", Parameters::none(), false)
        .unwrap_err();
    assert!(matches!(err, CaptureError::SessionClosed));
    assert_eq!(session.statement_count(), 1);
}

#[test]
fn test_empty_session_finishes() {
    let (clock, mut session) = manual_session(CaptureConfig::default());
    clock.advance(Duration::from_millis(3));
    session.finish().unwrap();
    assert_eq!(session.statement_count(), 0);
    assert_eq!(session.total_duration(), Some(Duration::from_millis(3)));
}

// ── Timing ──

#[test]
fn test_durations_are_gaps_between_events() {
    let (clock, mut session) = manual_session(CaptureConfig::default());
    assert_eq!(session.on_statement("SELECT 1", Parameters::none(), false).unwrap(), 1);
    clock.advance(Duration::from_millis(10));
    assert_eq!(session.on_statement("SELECT 2", Parameters::none(), false).unwrap(), 2);

    // Mid-capture: the first statement is closed, the last is still open.
    assert_eq!(
        session.statement(1).unwrap().duration(),
        Some(Duration::from_millis(10))
    );
    assert!(session.statement(2).unwrap().duration().is_none());
    assert!(session.statement(2).unwrap().end_time().is_none());

    clock.advance(Duration::from_millis(25));
    session.finish().unwrap();

    let last = session.statement(2).unwrap();
    assert_eq!(last.duration(), Some(Duration::from_millis(25)));
    assert_eq!(last.end_time(), session.finished_at());

    let first = session.statement(1).unwrap();
    assert_eq!(first.end_time(), Some(last.start_time()));
    assert_eq!(session.total_duration(), Some(Duration::from_millis(35)));
}

#[test]
fn test_durations_sum_to_window_after_first_statement() {
    let (clock, mut session) = manual_session(CaptureConfig::default());
    clock.advance(Duration::from_millis(4));
    for ms in [1, 2, 3] {
        session.on_statement("SELECT 1", Parameters::none(), false).unwrap();
        clock.advance(Duration::from_millis(ms));
    }
    session.finish().unwrap();

    let sum: Duration = session.iter().filter_map(CapturedStatement::duration).sum();
    assert_eq!(sum, Duration::from_millis(6));
    assert_eq!(session.total_duration(), Some(Duration::from_millis(10)));
}

#[test]
fn test_clock_going_backwards_clamps_to_zero() {
    let (clock, mut session) = manual_session(CaptureConfig::default());
    clock.advance(Duration::from_millis(50));
    session.on_statement("SELECT 1", Parameters::none(), false).unwrap();
    clock.set(DateTime::<Utc>::UNIX_EPOCH);
    session.finish().unwrap();
    assert_eq!(session.statement(1).unwrap().duration(), Some(Duration::ZERO));
}

#[test]
fn test_slow_threshold_does_not_change_data() {
    let config = CaptureConfig::new().with_slow_statement_threshold(Duration::from_millis(5));
    let (clock, mut session) = manual_session(config);
    session.on_statement("SELECT 1", Parameters::none(), false).unwrap();
    clock.advance(Duration::from_millis(20));
    session.finish().unwrap();
    assert_eq!(
        session.statement(1).unwrap().duration(),
        Some(Duration::from_millis(20))
    );
}

// ── Lookup ──

#[test]
fn test_sequence_indexes_are_one_based_and_contiguous() {
    let (_, mut session) = manual_session(CaptureConfig::default());
    for sql in ["SELECT 1", "SELECT 2", "SELECT 3"] {
        session.on_statement(sql, Parameters::none(), false).unwrap();
    }
    session.finish().unwrap();

    let indexes: Vec<_> = session.iter().map(|s| s.sequence_index()).collect();
    assert_eq!(indexes, [1, 2, 3]);
    assert_eq!((&session).into_iter().count(), 3);
    assert_eq!(session.statement(3).unwrap().raw_text(), "SELECT 3");
}

#[test]
fn test_statement_index_out_of_range() {
    let (_, mut session) = manual_session(CaptureConfig::default());
    session.on_statement("SELECT 1", Parameters::none(), false).unwrap();

    for index in [0, 2] {
        let err = session.statement(index).unwrap_err();
        assert!(matches!(
            err,
            CaptureError::RowIndexOutOfRange { index: i, count: 1 } if i == index
        ));
    }
}

// ── Recorded data ──

#[test]
fn test_statement_keeps_raw_text_params_and_classification() {
    let (_, mut session) = manual_session(CaptureConfig::default());
    let params = Parameters::from(vec![json!("joe"), json!(7)]);
    session
        .on_statement("INSERT INTO users (name, age)\nVALUES ($1, $2)", params.clone(), true)
        .unwrap();
    session.on_statement("VACUUM", Parameters::none(), false).unwrap();
    session.finish().unwrap();

    let insert = session.statement(1).unwrap();
    assert_eq!(insert.raw_text(), "INSERT INTO users (name, age)\nVALUES ($1, $2)");
    assert_eq!(insert.parameters(), &params);
    assert!(insert.is_batch());
    assert_eq!(insert.kind(), "INSERT");
    assert_eq!(insert.target_table(), "USERS");
    assert_eq!(insert.kind_and_table(), "INSERT USERS");

    let other = session.statement(2).unwrap();
    assert_eq!(other.kind(), "VACUUM");
    assert_eq!(other.target_table(), UNKNOWN_TABLE);
    assert!(!other.is_batch());
}

#[test]
fn test_statement_serializes_to_json() {
    let (clock, mut session) = manual_session(CaptureConfig::default());
    session
        .on_statement("DELETE FROM users WHERE id = $1", Parameters::from(vec![json!(1)]), false)
        .unwrap();
    clock.advance(Duration::from_millis(2));
    session.finish().unwrap();

    let value = serde_json::to_value(session.statement(1).unwrap()).unwrap();
    assert_eq!(value["sequence_index"], 1);
    assert_eq!(value["kind"], "DELETE");
    assert_eq!(value["target_table"], "USERS");
    assert_eq!(value["parameters"], json!([1]));
    assert_eq!(value["duration"], json!({ "secs": 0, "nanos": 2_000_000 }));
}

#[test]
fn test_debug_summarizes_session() {
    let (_, mut session) = manual_session(CaptureConfig::default());
    session.on_statement("SELECT 1", Parameters::none(), false).unwrap();
    let text = format!("{session:?}");
    assert!(text.contains("Active"));
    assert!(text.contains("statements: 1"));
}
