use std::{sync::Arc, time::Duration};

use leaderboard_back::{
    config::AppConfig,
    dao::{
        models::CompetitionRecord,
        score_store::{ScoreStore, memory::MemoryScoreStore},
    },
    error::ServiceError,
    services::{
        competition_service::{self, TickOutcome},
        public_service,
    },
    state::{
        AppState, SharedState,
        clock::ManualClock,
        state_machine::CompetitionPhase,
    },
};
use serde_json::{Value, json};

const DURATION: Duration = Duration::from_secs(10);

struct Harness {
    state: SharedState,
    store: MemoryScoreStore,
    clock: Arc<ManualClock>,
}

/// Tests run on paused time: the ticker only fires when a test lets a full second pass,
/// so countdown steps are otherwise driven explicitly.
fn harness(tree: Value, now_ms: i64) -> Harness {
    let store = MemoryScoreStore::with_tree(tree);
    let clock = Arc::new(ManualClock::new(now_ms));
    let config = AppConfig::new(DURATION);
    let state = AppState::new(Arc::new(store.clone()), config, clock.clone());
    Harness {
        state,
        store,
        clock,
    }
}

fn participants() -> Value {
    json!({
        "u1": {"user": {"Name": "A", "email": "a@x.com"}, "TotalScore": 50, "PacmanScore": 50},
        "u2": {"user": {"Name": "B", "email": "b@x.com"}, "TotalScore": 80},
    })
}

async fn stored_record(store: &MemoryScoreStore) -> Option<CompetitionRecord> {
    store
        .read("competition")
        .await
        .unwrap()
        .map(|value| serde_json::from_value(value).unwrap())
}

async fn names(state: &SharedState) -> Vec<String> {
    state
        .board()
        .await
        .ranking
        .entries()
        .iter()
        .map(|record| record.name.clone())
        .collect()
}

async fn wait_for_no_subscribers(store: &MemoryScoreStore) {
    for _ in 0..100 {
        if store.subscriber_count() == 0 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(store.subscriber_count(), 0, "live subscription still fed");
}

async fn wait_for_names(state: &SharedState, expected: &[&str]) {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if names(state).await == expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("ranking never became {expected:?}"));
}

#[tokio::test(start_paused = true)]
async fn start_persists_active_record_and_full_countdown() {
    let h = harness(participants(), 1_000);

    competition_service::start(&h.state).await.unwrap();

    assert_eq!(h.state.phase().await, CompetitionPhase::Running);
    assert_eq!(
        stored_record(&h.store).await,
        Some(CompetitionRecord::started(1_000, 11_000))
    );
    let board = h.state.board().await;
    assert_eq!(board.countdown_secs, 10);
    assert!(!board.frozen);
    assert!(h.state.has_live_tasks().await);

    h.state.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn countdown_expires_run_exactly_once() {
    let h = harness(participants(), 1_000);
    competition_service::start(&h.state).await.unwrap();

    let mut outcomes = Vec::new();
    for _ in 0..10 {
        h.clock.advance(Duration::from_secs(1));
        outcomes.push(competition_service::tick(&h.state).await.unwrap());
    }

    let expected: Vec<_> = (1..=9)
        .rev()
        .map(|remaining_secs| TickOutcome::Ticked { remaining_secs })
        .chain([TickOutcome::Expired])
        .collect();
    assert_eq!(outcomes, expected);

    assert_eq!(h.state.phase().await, CompetitionPhase::Completed);
    assert_eq!(
        stored_record(&h.store).await,
        Some(CompetitionRecord::finished(Some(1_000), 11_000))
    );
    let board = h.state.board().await;
    assert_eq!(board.countdown_secs, 0);
    assert!(board.frozen);
    assert_eq!(names(&h.state).await, vec!["B", "A"]);
    assert!(!h.state.has_live_tasks().await);

    h.clock.advance(Duration::from_secs(1));
    assert_eq!(
        competition_service::tick(&h.state).await.unwrap(),
        TickOutcome::Inactive
    );
    assert_eq!(
        stored_record(&h.store).await,
        Some(CompetitionRecord::finished(Some(1_000), 11_000))
    );
}

#[tokio::test(start_paused = true)]
async fn reset_clears_ranking_and_restores_countdown() {
    let h = harness(participants(), 1_000);
    competition_service::start(&h.state).await.unwrap();
    competition_service::stop(&h.state).await.unwrap();
    assert_eq!(names(&h.state).await, vec!["B", "A"]);

    competition_service::reset(&h.state).await.unwrap();

    assert_eq!(h.state.phase().await, CompetitionPhase::Idle);
    let board = h.state.board().await;
    assert!(board.ranking.is_empty());
    assert!(!board.frozen);
    assert_eq!(board.countdown_secs, 10);
    assert_eq!(board.error, None);
    assert_eq!(stored_record(&h.store).await, None);
}

#[tokio::test(start_paused = true)]
async fn reset_without_concluded_run_is_rejected() {
    let h = harness(participants(), 1_000);

    let err = competition_service::reset(&h.state).await.unwrap_err();

    assert!(matches!(err, ServiceError::InvalidState(_)));
    assert_eq!(h.state.board().await.error, None);
}

#[tokio::test(start_paused = true)]
async fn second_stop_is_rejected() {
    let h = harness(participants(), 1_000);
    competition_service::start(&h.state).await.unwrap();
    competition_service::stop(&h.state).await.unwrap();

    let err = competition_service::stop(&h.state).await.unwrap_err();

    assert!(matches!(err, ServiceError::InvalidState(_)));
    assert_eq!(h.state.phase().await, CompetitionPhase::Completed);
}

#[tokio::test(start_paused = true)]
async fn mount_with_elapsed_run_completes_immediately() {
    let now = 100_000;
    let mut tree = participants();
    tree["competition"] = json!({"active": true, "startTime": now - 15_000, "endTime": now - 5_000});
    let h = harness(tree, now);

    competition_service::restore(&h.state).await.unwrap();

    assert_eq!(h.state.phase().await, CompetitionPhase::Completed);
    assert_eq!(
        stored_record(&h.store).await,
        Some(CompetitionRecord::finished(Some(now - 15_000), now))
    );
    let board = h.state.board().await;
    assert!(board.frozen);
    assert_eq!(board.countdown_secs, 0);
    assert_eq!(names(&h.state).await, vec!["B", "A"]);
    assert!(!h.state.has_live_tasks().await);
}

#[tokio::test(start_paused = true)]
async fn mount_with_finished_run_shows_final_ranking() {
    let mut tree = participants();
    tree["competition"] = json!({"active": false, "startTime": 1_000, "endTime": 9_000});
    let h = harness(tree, 50_000);

    competition_service::restore(&h.state).await.unwrap();

    assert_eq!(h.state.phase().await, CompetitionPhase::Completed);
    assert_eq!(names(&h.state).await, vec!["B", "A"]);
    assert!(h.state.board().await.frozen);
    assert_eq!(
        stored_record(&h.store).await,
        Some(CompetitionRecord::finished(Some(1_000), 9_000))
    );
}

#[tokio::test(start_paused = true)]
async fn mount_with_active_run_resumes_countdown() {
    let mut tree = participants();
    tree["competition"] = json!({"active": true, "startTime": 1_000, "endTime": 11_000});
    let h = harness(tree, 4_500);

    competition_service::restore(&h.state).await.unwrap();

    assert_eq!(h.state.phase().await, CompetitionPhase::Running);
    assert_eq!(h.state.board().await.countdown_secs, 7);
    assert!(h.state.has_live_tasks().await);
    wait_for_names(&h.state, &["B", "A"]).await;

    h.state.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn mount_without_record_stays_idle() {
    let h = harness(participants(), 1_000);

    competition_service::restore(&h.state).await.unwrap();

    assert_eq!(h.state.phase().await, CompetitionPhase::Idle);
    assert_eq!(h.state.board().await.countdown_secs, 10);
}

#[tokio::test(start_paused = true)]
async fn failed_start_write_stays_idle_with_error() {
    let h = harness(participants(), 1_000);
    h.store.set_fail_writes(true);

    let err = competition_service::start(&h.state).await.unwrap_err();

    assert!(matches!(err, ServiceError::Unavailable(_)));
    assert_eq!(h.state.phase().await, CompetitionPhase::Idle);
    assert_eq!(
        h.state.board().await.error.as_deref(),
        Some("Failed to start competition")
    );
    assert!(!h.state.has_live_tasks().await);

    h.store.set_fail_writes(false);
    competition_service::start(&h.state).await.unwrap();
    assert_eq!(h.state.board().await.error, None);

    h.state.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn failed_stop_write_keeps_run_going() {
    let h = harness(participants(), 1_000);
    competition_service::start(&h.state).await.unwrap();
    wait_for_names(&h.state, &["B", "A"]).await;
    h.store.set_fail_writes(true);

    let err = competition_service::stop(&h.state).await.unwrap_err();

    assert!(matches!(err, ServiceError::Unavailable(_)));
    assert_eq!(h.state.phase().await, CompetitionPhase::Running);
    assert_eq!(
        h.state.board().await.error.as_deref(),
        Some("Failed to stop competition")
    );

    h.state.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn live_updates_reach_the_board_while_running() {
    let h = harness(participants(), 1_000);
    competition_service::start(&h.state).await.unwrap();
    wait_for_names(&h.state, &["B", "A"]).await;

    h.store
        .write("u3", json!({"user": {"Name": "C"}, "TotalScore": 95}))
        .await
        .unwrap();

    wait_for_names(&h.state, &["C", "B", "A"]).await;
    let leaderboard = public_service::leaderboard(&h.state).await;
    assert!(!leaderboard.frozen);
    assert_eq!(leaderboard.entries[0].email, "No email");

    h.state.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn stop_freezes_ranking_against_later_writes() {
    let h = harness(participants(), 1_000);
    competition_service::start(&h.state).await.unwrap();
    assert_eq!(h.store.subscriber_count(), 1);
    competition_service::stop(&h.state).await.unwrap();
    wait_for_no_subscribers(&h.store).await;

    h.store
        .write("u3", json!({"user": {"Name": "C"}, "TotalScore": 95}))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(names(&h.state).await, vec!["B", "A"]);
    assert!(public_service::leaderboard(&h.state).await.frozen);
}

#[tokio::test(start_paused = true)]
async fn failed_final_read_keeps_live_ranking_frozen() {
    let h = harness(participants(), 1_000);
    competition_service::start(&h.state).await.unwrap();
    wait_for_names(&h.state, &["B", "A"]).await;
    h.store.set_fail_reads(true);

    competition_service::stop(&h.state).await.unwrap();

    assert_eq!(h.state.phase().await, CompetitionPhase::Completed);
    let board = h.state.board().await;
    assert!(board.frozen);
    assert_eq!(names(&h.state).await, vec!["B", "A"]);
    assert_eq!(
        board.error.as_deref(),
        Some("Failed to fetch leaderboard data")
    );
}

#[tokio::test(start_paused = true)]
async fn teardown_stops_background_tasks() {
    let h = harness(participants(), 1_000);
    competition_service::start(&h.state).await.unwrap();
    assert!(h.state.has_live_tasks().await);

    h.state.teardown().await;

    assert!(!h.state.has_live_tasks().await);
    wait_for_no_subscribers(&h.store).await;

    // The run is still marked running, so a surviving ticker would keep counting down.
    tokio::time::sleep(Duration::from_millis(3_500)).await;
    assert_eq!(h.state.phase().await, CompetitionPhase::Running);
    assert_eq!(h.state.board().await.countdown_secs, 10);
}

#[tokio::test(start_paused = true)]
async fn expiry_from_countdown_releases_subscription() {
    let h = harness(participants(), 1_000);
    competition_service::start(&h.state).await.unwrap();

    for _ in 0..10 {
        competition_service::tick(&h.state).await.unwrap();
    }

    assert_eq!(h.state.phase().await, CompetitionPhase::Completed);
    wait_for_no_subscribers(&h.store).await;
}

#[tokio::test(start_paused = true)]
async fn countdown_runs_for_the_full_duration() {
    let h = harness(participants(), 1_000);
    competition_service::start(&h.state).await.unwrap();

    tokio::time::sleep(Duration::from_millis(5_200)).await;
    assert_eq!(h.state.phase().await, CompetitionPhase::Running);
    assert_eq!(h.state.board().await.countdown_secs, 5);

    tokio::time::sleep(Duration::from_millis(4_000)).await;
    assert_eq!(h.state.phase().await, CompetitionPhase::Running);
    assert_eq!(h.state.board().await.countdown_secs, 1);

    tokio::time::sleep(Duration::from_millis(1_000)).await;
    assert_eq!(h.state.phase().await, CompetitionPhase::Completed);
    assert_eq!(h.state.board().await.countdown_secs, 0);
    assert!(!h.state.has_live_tasks().await);
}

#[tokio::test(start_paused = true)]
async fn competition_status_reports_countdown() {
    let h = harness(participants(), 1_000);
    competition_service::start(&h.state).await.unwrap();
    h.clock.advance(Duration::from_secs(1));
    competition_service::tick(&h.state).await.unwrap();

    let status = public_service::competition(&h.state).await;

    assert!(status.active);
    assert_eq!(status.start_time_ms, Some(1_000));
    assert_eq!(status.end_time_ms, Some(11_000));
    assert_eq!(status.remaining_secs, 9);
    assert_eq!(status.remaining, "00:00:09");
    assert_eq!(status.duration_secs, 10);

    h.state.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn ticker_expires_run_on_its_own() {
    let store = MemoryScoreStore::with_tree(participants());
    let clock = Arc::new(ManualClock::new(1_000));
    let config = AppConfig::new(Duration::from_secs(3));
    let state = AppState::new(Arc::new(store.clone()), config, clock);

    competition_service::start(&state).await.unwrap();
    tokio::time::sleep(Duration::from_millis(3_500)).await;

    assert_eq!(state.phase().await, CompetitionPhase::Completed);
    assert_eq!(state.board().await.countdown_secs, 0);
    assert!(!state.has_live_tasks().await);
}
