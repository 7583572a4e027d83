use serde::Serialize;
use utoipa::ToSchema;

use crate::state::leaderboard::{GameScores, Ranking, ScoreRecord};

/// Podium position awarded to the first three entries.
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Medal {
    /// First place.
    Gold,
    /// Second place.
    Silver,
    /// Third place.
    Bronze,
}

impl Medal {
    /// Medal for a 1-based rank, if it is on the podium.
    pub fn for_rank(rank: usize) -> Option<Self> {
        match rank {
            1 => Some(Medal::Gold),
            2 => Some(Medal::Silver),
            3 => Some(Medal::Bronze),
            _ => None,
        }
    }
}

/// Per-game sub-scores of a participant.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct GameScoresSummary {
    /// Escape room score.
    pub escape_room: i64,
    /// Pacman score.
    pub pacman: i64,
    /// Pizzeria score.
    pub pizzeria: i64,
    /// Tetris score.
    pub tetris: i64,
}

impl From<GameScores> for GameScoresSummary {
    fn from(scores: GameScores) -> Self {
        Self {
            escape_room: scores.escape_room,
            pacman: scores.pacman,
            pizzeria: scores.pizzeria,
            tetris: scores.tetris,
        }
    }
}

/// One row of the leaderboard table.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    /// 1-based position in the ranking.
    pub rank: usize,
    /// Key of the participant in the shared store.
    pub id: String,
    /// Display name, "Unknown" when missing.
    pub name: String,
    /// Contact address, "No email" when missing.
    pub email: String,
    /// Stored total used for ranking.
    pub total_score: i64,
    /// Per-game breakdown.
    pub game_scores: GameScoresSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Podium medal for the first three ranks.
    pub medal: Option<Medal>,
}

impl LeaderboardEntry {
    fn new(index: usize, record: ScoreRecord) -> Self {
        let rank = index + 1;
        Self {
            rank,
            id: record.id,
            name: record.name,
            email: record.email,
            total_score: record.total_score,
            game_scores: record.game_scores.into(),
            medal: Medal::for_rank(rank),
        }
    }
}

/// Ranked leaderboard as served to the display.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct LeaderboardResponse {
    /// Rows ordered by rank.
    pub entries: Vec<LeaderboardEntry>,
    /// True once the final snapshot of a run has been taken.
    pub frozen: bool,
}

impl LeaderboardResponse {
    /// Number the ranking from 1 and award medals to the podium.
    pub fn from_ranking(ranking: Ranking, frozen: bool) -> Self {
        let entries = ranking
            .into_iter()
            .enumerate()
            .map(|(index, record)| LeaderboardEntry::new(index, record))
            .collect();
        Self { entries, frozen }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, total_score: i64) -> ScoreRecord {
        ScoreRecord {
            id: id.into(),
            name: id.to_uppercase(),
            email: "No email".into(),
            total_score,
            game_scores: GameScores::default(),
        }
    }

    #[test]
    fn podium_gets_medals_and_ranks_are_one_based() {
        let ranking = Ranking::from_records(vec![
            record("a", 40),
            record("b", 30),
            record("c", 20),
            record("d", 10),
        ]);

        let response = LeaderboardResponse::from_ranking(ranking, true);

        let summary: Vec<_> = response
            .entries
            .iter()
            .map(|entry| (entry.rank, entry.id.as_str(), entry.medal))
            .collect();
        assert_eq!(
            summary,
            vec![
                (1, "a", Some(Medal::Gold)),
                (2, "b", Some(Medal::Silver)),
                (3, "c", Some(Medal::Bronze)),
                (4, "d", None),
            ]
        );
        assert!(response.frozen);
    }
}
