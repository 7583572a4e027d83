use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Competition status and countdown payloads.
pub mod competition;
/// Health check payload.
pub mod health;
/// Ranked leaderboard payloads.
pub mod leaderboard;
/// Public view of the competition phase.
pub mod phase;
/// Server-sent event envelopes.
pub mod sse;

/// Render epoch milliseconds as an RFC 3339 timestamp.
fn format_epoch_millis(ms: i64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000)
        .ok()
        .and_then(|time| time.format(&Rfc3339).ok())
        .unwrap_or_else(|| "invalid-timestamp".into())
}

/// Render a countdown as `HH:MM:SS`; hours keep growing past 99.
pub fn format_countdown(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
