use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the leaderboard backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::public::get_leaderboard,
        crate::routes::public::get_competition,
        crate::routes::public::get_live_scores,
        crate::routes::admin::start_competition,
        crate::routes::admin::stop_competition,
        crate::routes::admin::reset_competition,
        crate::routes::sse::public_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::leaderboard::LeaderboardResponse,
            crate::dto::leaderboard::LeaderboardEntry,
            crate::dto::leaderboard::GameScoresSummary,
            crate::dto::leaderboard::Medal,
            crate::dto::competition::CompetitionStatus,
            crate::dto::competition::CountdownSnapshot,
            crate::dto::phase::VisiblePhase,
            crate::dto::sse::ErrorEvent,
            crate::dao::models::CompetitionRecord,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "public", description = "Read-only leaderboard and competition views"),
        (name = "admin", description = "Competition lifecycle controls"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
