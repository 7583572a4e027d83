use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Competition record persisted in the shared store so every viewer observes the same run.
///
/// Timestamps are Unix epoch milliseconds. An absent record means no run has ever
/// happened (or the last one was reset).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CompetitionRecord {
    /// Whether a run is currently in progress.
    #[serde(default)]
    pub active: bool,
    /// When the current (or last) run started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    /// Planned end while active, actual end once the run concluded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
}

impl CompetitionRecord {
    /// Record written when a run starts.
    pub fn started(start_time: i64, end_time: i64) -> Self {
        Self {
            active: true,
            start_time: Some(start_time),
            end_time: Some(end_time),
        }
    }

    /// Record written when a run concludes, keeping the original start time.
    pub fn finished(start_time: Option<i64>, end_time: i64) -> Self {
        Self {
            active: false,
            start_time,
            end_time: Some(end_time),
        }
    }

    /// True when this record describes a concluded run.
    pub fn is_finished(&self) -> bool {
        !self.active && self.end_time.is_some()
    }

    /// Start time of an in-progress run, if this record describes one.
    pub fn running_since(&self) -> Option<i64> {
        if self.active { self.start_time } else { None }
    }
}
