use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        competition::{CompetitionStatus, CountdownSnapshot},
        leaderboard::LeaderboardResponse,
        sse::{ErrorEvent, ServerEvent},
    },
    state::{SharedState, board::Board, state_machine::CompetitionPhase},
};

const EVENT_PHASE_CHANGED: &str = "phase_changed";
const EVENT_LEADERBOARD_UPDATED: &str = "leaderboard.updated";
const EVENT_COUNTDOWN: &str = "countdown";
const EVENT_ERROR: &str = "error";

/// Broadcast the competition status after a phase change.
pub async fn broadcast_phase_changed(state: &SharedState, phase: CompetitionPhase) {
    let board = state.board().await;
    let payload = CompetitionStatus::new(phase, &board, state.config().duration_secs());
    send_public_event(state, EVENT_PHASE_CHANGED, &payload);
}

/// Build the event describing the current competition status, sent to new subscribers.
pub async fn phase_changed_event(state: &SharedState) -> Option<ServerEvent> {
    let board = state.board().await;
    let payload = CompetitionStatus::new(state.phase().await, &board, state.config().duration_secs());
    ServerEvent::json(Some(EVENT_PHASE_CHANGED.to_string()), &payload).ok()
}

/// Broadcast the ranking currently on the board.
pub fn broadcast_leaderboard(state: &SharedState, board: &Board) {
    let payload = LeaderboardResponse::from_ranking(board.ranking.clone(), board.frozen);
    send_public_event(state, EVENT_LEADERBOARD_UPDATED, &payload);
}

/// Broadcast the countdown after a tick.
pub fn broadcast_countdown(state: &SharedState, remaining_secs: u64) {
    send_public_event(state, EVENT_COUNTDOWN, &CountdownSnapshot::new(remaining_secs));
}

/// Broadcast a user-visible error message.
pub fn broadcast_error(state: &SharedState, message: &str) {
    let payload = ErrorEvent {
        message: message.to_string(),
    };
    send_public_event(state, EVENT_ERROR, &payload);
}

fn send_public_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.public_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize public SSE payload"),
    }
}
