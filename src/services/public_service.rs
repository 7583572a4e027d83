//! Read-only projections of the board for the public display.

use crate::{
    dto::{competition::CompetitionStatus, leaderboard::LeaderboardResponse},
    error::ServiceError,
    services::competition_service,
    state::SharedState,
};

/// Return the ranking currently displayed: live while running, frozen once completed.
pub async fn leaderboard(state: &SharedState) -> LeaderboardResponse {
    let board = state.board().await;
    LeaderboardResponse::from_ranking(board.ranking, board.frozen)
}

/// Return the competition phase, record timestamps and countdown.
pub async fn competition(state: &SharedState) -> CompetitionStatus {
    let phase = state.phase().await;
    let board = state.board().await;
    CompetitionStatus::new(phase, &board, state.config().duration_secs())
}

/// Read the participants region once and rank it, whatever the competition phase.
pub async fn live_scores(state: &SharedState) -> Result<LeaderboardResponse, ServiceError> {
    let ranking = competition_service::read_ranking(state).await?;
    Ok(LeaderboardResponse::from_ranking(ranking, false))
}
