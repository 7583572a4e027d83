use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dto::{format_countdown, format_epoch_millis, phase::VisiblePhase},
    state::{board::Board, state_machine::CompetitionPhase},
};

/// Competition status as shown next to the leaderboard.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct CompetitionStatus {
    /// Current lifecycle phase.
    pub phase: VisiblePhase,
    /// Mirrors the `active` flag of the shared competition record.
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Run start in Unix epoch milliseconds.
    pub start_time_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Planned end while running, actual end once concluded.
    pub end_time_ms: Option<i64>,
    /// RFC 3339 rendering of `start_time_ms`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    /// RFC 3339 rendering of `end_time_ms`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    /// Whole seconds left on the countdown.
    pub remaining_secs: u64,
    /// Countdown formatted as `HH:MM:SS`.
    pub remaining: String,
    /// Configured length of a run in seconds.
    pub duration_secs: u64,
    /// Message describing the last failure to reach the shared store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CompetitionStatus {
    /// Project the board for the given phase.
    pub fn new(phase: CompetitionPhase, board: &Board, duration_secs: u64) -> Self {
        let record = board.record.unwrap_or_default();
        Self {
            phase: phase.into(),
            active: record.active,
            start_time_ms: record.start_time,
            end_time_ms: record.end_time,
            start_time: record.start_time.map(format_epoch_millis),
            end_time: record.end_time.map(format_epoch_millis),
            remaining_secs: board.countdown_secs,
            remaining: format_countdown(board.countdown_secs),
            duration_secs,
            error: board.error.clone(),
        }
    }
}

/// Countdown payload sent on every tick.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct CountdownSnapshot {
    /// Whole seconds left on the countdown.
    pub remaining_secs: u64,
    /// Countdown formatted as `HH:MM:SS`.
    pub remaining: String,
}

impl CountdownSnapshot {
    /// Snapshot for `remaining_secs` seconds left.
    pub fn new(remaining_secs: u64) -> Self {
        Self {
            remaining_secs,
            remaining: format_countdown(remaining_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::CompetitionRecord;

    #[test]
    fn status_reflects_board() {
        let board = Board {
            countdown_secs: 7,
            record: Some(CompetitionRecord::started(1_000, 11_000)),
            error: Some("Failed to fetch leaderboard data".into()),
            ..Board::default()
        };

        let status = CompetitionStatus::new(CompetitionPhase::Running, &board, 10);

        assert_eq!(status.phase, VisiblePhase::Running);
        assert!(status.active);
        assert_eq!(status.start_time_ms, Some(1_000));
        assert_eq!(status.end_time.as_deref(), Some("1970-01-01T00:00:11Z"));
        assert_eq!(status.remaining, "00:00:07");
        assert_eq!(status.duration_secs, 10);
        assert_eq!(
            status.error.as_deref(),
            Some("Failed to fetch leaderboard data")
        );
    }

    #[test]
    fn idle_status_has_no_timestamps() {
        let status = CompetitionStatus::new(CompetitionPhase::Idle, &Board::idle(1200), 1200);
        assert!(!status.active);
        assert_eq!(status.start_time, None);
        assert_eq!(status.remaining, "00:20:00");
    }
}
