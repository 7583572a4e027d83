use std::future::Future;

use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::competition::CompetitionStatus,
    error::{AppError, ServiceError},
    services::{competition_service, public_service},
    state::SharedState,
};

/// Endpoints driving the competition lifecycle.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/admin/competition/start", post(start_competition))
        .route("/admin/competition/stop", post(stop_competition))
        .route("/admin/competition/reset", post(reset_competition))
}

/// Run a lifecycle operation on its own task so a dropped request cannot interrupt a
/// transition between planning and applying it.
async fn drive<F, Fut>(state: SharedState, operation: F) -> Result<Json<CompetitionStatus>, AppError>
where
    F: FnOnce(SharedState) -> Fut,
    Fut: Future<Output = Result<(), ServiceError>> + Send + 'static,
{
    tokio::spawn(operation(state.clone()))
        .await
        .map_err(|err| AppError::Internal(format!("competition task failed: {err}")))??;
    Ok(Json(public_service::competition(&state).await))
}

#[utoipa::path(
    post,
    path = "/admin/competition/start",
    tag = "admin",
    responses(
        (status = 200, description = "Competition started", body = CompetitionStatus),
        (status = 409, description = "A run is already in progress or awaiting reset"),
        (status = 503, description = "Shared store unreachable")
    )
)]
/// Start a new timed run.
pub async fn start_competition(
    State(state): State<SharedState>,
) -> Result<Json<CompetitionStatus>, AppError> {
    drive(state, |state| async move { competition_service::start(&state).await }).await
}

#[utoipa::path(
    post,
    path = "/admin/competition/stop",
    tag = "admin",
    responses(
        (status = 200, description = "Competition stopped and leaderboard frozen", body = CompetitionStatus),
        (status = 409, description = "No run in progress"),
        (status = 503, description = "Shared store unreachable")
    )
)]
/// Stop the running competition and freeze the final ranking.
pub async fn stop_competition(
    State(state): State<SharedState>,
) -> Result<Json<CompetitionStatus>, AppError> {
    drive(state, |state| async move { competition_service::stop(&state).await }).await
}

#[utoipa::path(
    post,
    path = "/admin/competition/reset",
    tag = "admin",
    responses(
        (status = 200, description = "Competition cleared", body = CompetitionStatus),
        (status = 409, description = "No concluded run to reset"),
        (status = 503, description = "Shared store unreachable")
    )
)]
/// Clear a concluded run so a new one can be started.
pub async fn reset_competition(
    State(state): State<SharedState>,
) -> Result<Json<CompetitionStatus>, AppError> {
    drive(state, |state| async move { competition_service::reset(&state).await }).await
}
