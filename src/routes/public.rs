use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::{competition::CompetitionStatus, leaderboard::LeaderboardResponse},
    error::AppError,
    services::public_service,
    state::SharedState,
};

/// Public read-only endpoints feeding the leaderboard display.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/public/leaderboard", get(get_leaderboard))
        .route("/public/competition", get(get_competition))
        .route("/public/scores", get(get_live_scores))
}

#[utoipa::path(
    get,
    path = "/public/leaderboard",
    tag = "public",
    responses((status = 200, description = "Ranking currently displayed", body = LeaderboardResponse))
)]
/// Return the ranking on the board, live while running and frozen once the run concluded.
pub async fn get_leaderboard(State(state): State<SharedState>) -> Json<LeaderboardResponse> {
    Json(public_service::leaderboard(&state).await)
}

#[utoipa::path(
    get,
    path = "/public/competition",
    tag = "public",
    responses((status = 200, description = "Competition phase and countdown", body = CompetitionStatus))
)]
/// Return the competition phase, its persisted timestamps and the countdown.
pub async fn get_competition(State(state): State<SharedState>) -> Json<CompetitionStatus> {
    Json(public_service::competition(&state).await)
}

#[utoipa::path(
    get,
    path = "/public/scores",
    tag = "public",
    responses(
        (status = 200, description = "Fresh ranking read from the shared store", body = LeaderboardResponse),
        (status = 503, description = "Shared store unreachable")
    )
)]
/// Read and rank the participant records now, regardless of the competition phase.
pub async fn get_live_scores(
    State(state): State<SharedState>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let payload = public_service::live_scores(&state).await?;
    Ok(Json(payload))
}
