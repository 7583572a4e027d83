/// Score aggregation from raw participant snapshots.
pub mod aggregator;
/// Competition lifecycle controller.
pub mod competition_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Live subscription and countdown ticker tasks.
mod live_feed;
/// Public service for read-only leaderboard information.
pub mod public_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
