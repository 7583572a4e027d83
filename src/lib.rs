//! Library crate for leaderboard-back, exposing modules for binaries and integration tests.

/// Runtime configuration loading.
pub mod config;
/// Shared store access and persisted models.
pub mod dao;
/// Payloads served over REST and SSE.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// HTTP route trees.
pub mod routes;
/// Business logic behind the routes.
pub mod services;
/// Shared application state and the competition state machine.
pub mod state;
