//! Turns a raw snapshot of participant records into a [`Ranking`].

use serde_json::Value;

use crate::state::leaderboard::{GameScores, Ranking, ScoreRecord};

const DEFAULT_NAME: &str = "Unknown";
const DEFAULT_EMAIL: &str = "No email";

/// Build the ranking for a snapshot of the participants region.
///
/// Only entries carrying a nested `user` object and a `TotalScore` are kept; anything else
/// (including the competition record when it lives under the same root) is skipped.
/// Missing or unusable fields fall back to their defaults.
pub fn aggregate(raw: Option<&Value>) -> Ranking {
    let Some(entries) = raw.and_then(Value::as_object) else {
        return Ranking::default();
    };

    let records = entries
        .iter()
        .filter_map(|(id, bag)| score_record(id, bag))
        .collect();

    Ranking::from_records(records)
}

fn score_record(id: &str, bag: &Value) -> Option<ScoreRecord> {
    let user = bag.get("user").filter(|user| user.is_object())?;
    let total = bag.get("TotalScore").filter(|total| !total.is_null())?;

    Some(ScoreRecord {
        id: id.to_string(),
        name: text_or(user.get("Name"), DEFAULT_NAME),
        email: text_or(user.get("email"), DEFAULT_EMAIL),
        total_score: score(Some(total)),
        game_scores: GameScores {
            escape_room: score(bag.get("EscapeRoomScore")),
            pacman: score(bag.get("PacmanScore")),
            pizzeria: score(bag.get("PizzeriaScore")),
            tetris: score(bag.get("TetrisScore")),
        },
    })
}

fn text_or(value: Option<&Value>, default: &str) -> String {
    value
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .unwrap_or(default)
        .to_string()
}

fn score(value: Option<&Value>) -> i64 {
    value
        .and_then(|value| {
            value
                .as_i64()
                .or_else(|| value.as_f64().map(|float| float.trunc() as i64))
        })
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(ranking: &Ranking) -> Vec<&str> {
        ranking.entries().iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn ranks_by_total_score_descending() {
        let raw = json!({
            "u1": {"user": {"Name": "A", "email": "a@x.com"}, "TotalScore": 50, "PacmanScore": 50},
            "u2": {"user": {"Name": "B", "email": "b@x.com"}, "TotalScore": 80},
        });

        let ranking = aggregate(Some(&raw));

        assert_eq!(ids(&ranking), vec!["u2", "u1"]);
        let top = &ranking.entries()[0];
        assert_eq!(top.name, "B");
        assert_eq!(top.total_score, 80);
        assert_eq!(top.game_scores, GameScores::default());
        let second = &ranking.entries()[1];
        assert_eq!(second.name, "A");
        assert_eq!(second.game_scores.pacman, 50);
    }

    #[test]
    fn entries_without_user_or_total_are_skipped() {
        let raw = json!({
            "no_user": {"TotalScore": 10},
            "no_total": {"user": {"Name": "X"}},
            "null_total": {"user": {"Name": "Y"}, "TotalScore": null},
            "scalar_user": {"user": "Z", "TotalScore": 3},
            "competition": {"active": true, "startTime": 1000},
            "ok": {"user": {}, "TotalScore": 1},
        });

        let ranking = aggregate(Some(&raw));

        assert_eq!(ids(&ranking), vec!["ok"]);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let raw = json!({"u": {"user": {"Name": ""}, "TotalScore": "lots", "TetrisScore": 7.9}});

        let ranking = aggregate(Some(&raw));
        let record = &ranking.entries()[0];

        assert_eq!(record.name, "Unknown");
        assert_eq!(record.email, "No email");
        assert_eq!(record.total_score, 0);
        assert_eq!(record.game_scores.tetris, 7);
        assert_eq!(record.game_scores.escape_room, 0);
    }

    #[test]
    fn total_score_is_not_recomputed() {
        let raw = json!({
            "u": {"user": {}, "TotalScore": 5, "EscapeRoomScore": 100, "PacmanScore": 100}
        });
        assert_eq!(aggregate(Some(&raw)).entries()[0].total_score, 5);
    }

    #[test]
    fn equal_scores_keep_snapshot_order() {
        let raw = json!({
            "c": {"user": {}, "TotalScore": 10},
            "a": {"user": {}, "TotalScore": 20},
            "b": {"user": {}, "TotalScore": 10},
            "d": {"user": {}, "TotalScore": 10},
        });

        assert_eq!(ids(&aggregate(Some(&raw))), vec!["a", "c", "b", "d"]);
    }

    #[test]
    fn absent_or_non_object_snapshot_is_empty() {
        assert!(aggregate(None).is_empty());
        assert!(aggregate(Some(&json!(null))).is_empty());
        assert!(aggregate(Some(&json!([1, 2]))).is_empty());
        assert!(aggregate(Some(&json!({}))).is_empty());
    }
}
