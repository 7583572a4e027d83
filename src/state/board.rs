use crate::{dao::models::CompetitionRecord, state::leaderboard::Ranking};

/// Display model owned by the competition controller.
///
/// Routes and SSE streams read clones of it; only the competition service mutates it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    /// Ranking currently displayed: live while running, frozen once completed.
    pub ranking: Ranking,
    /// Set once the final snapshot of a run has been taken.
    pub frozen: bool,
    /// Whole seconds left on the countdown.
    pub countdown_secs: u64,
    /// Last competition record written to or read from the shared store.
    pub record: Option<CompetitionRecord>,
    /// User-visible message describing the last store failure.
    pub error: Option<String>,
}

impl Board {
    /// Idle board showing the full configured duration.
    pub fn idle(duration_secs: u64) -> Self {
        Self {
            countdown_secs: duration_secs,
            ..Self::default()
        }
    }
}
