/// Per-game sub-scores tracked for each participant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GameScores {
    /// `EscapeRoomScore` field.
    pub escape_room: i64,
    /// `PacmanScore` field.
    pub pacman: i64,
    /// `PizzeriaScore` field.
    pub pizzeria: i64,
    /// `TetrisScore` field.
    pub tetris: i64,
}

/// One participant as displayed on the leaderboard.
///
/// `total_score` is taken as stored and is never recomputed from the sub-scores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreRecord {
    /// Key of the participant in the shared store.
    pub id: String,
    /// `user.Name`, defaulting to "Unknown".
    pub name: String,
    /// `user.email`, defaulting to "No email".
    pub email: String,
    /// `TotalScore` as stored.
    pub total_score: i64,
    /// Per-game sub-scores.
    pub game_scores: GameScores,
}

/// Participants ordered by total score, highest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ranking(Vec<ScoreRecord>);

impl Ranking {
    /// Sort `records` by descending total score, keeping the given order between equal scores.
    pub fn from_records(mut records: Vec<ScoreRecord>) -> Self {
        records.sort_by(|a, b| b.total_score.cmp(&a.total_score));
        Self(records)
    }

    /// Records in rank order.
    pub fn entries(&self) -> &[ScoreRecord] {
        &self.0
    }

    /// Number of ranked participants.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when nobody is ranked.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for Ranking {
    type Item = ScoreRecord;
    type IntoIter = std::vec::IntoIter<ScoreRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
