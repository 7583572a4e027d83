use axum::Router;

use crate::state::SharedState;

/// Competition lifecycle controls.
pub mod admin;
/// Swagger UI.
pub mod docs;
/// Health check.
pub mod health;
/// Read-only leaderboard views.
pub mod public;
/// Server-sent events.
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(public::router())
        .merge(admin::router())
        .merge(sse::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
