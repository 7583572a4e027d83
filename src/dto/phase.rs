use serde::Serialize;
use utoipa::ToSchema;

use crate::state::state_machine::CompetitionPhase;

/// Publicly visible competition phase exposed to clients (REST/SSE).
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisiblePhase {
    /// No run in progress.
    Idle,
    /// Countdown running, leaderboard live.
    Running,
    /// Run over, leaderboard frozen.
    Completed,
}

impl From<CompetitionPhase> for VisiblePhase {
    fn from(value: CompetitionPhase) -> Self {
        match value {
            CompetitionPhase::Idle => VisiblePhase::Idle,
            CompetitionPhase::Running => VisiblePhase::Running,
            CompetitionPhase::Completed => VisiblePhase::Completed,
        }
    }
}
