//! Competition lifecycle controller. Every operation runs under the transition gate held by
//! [`AppState`](crate::state::AppState), so ticks, live updates and admin actions never
//! interleave mid-step. Store failures are logged, copied to the board as a user-visible
//! message and returned to the caller.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::{
    dao::{models::CompetitionRecord, storage::StorageError},
    error::ServiceError,
    services::{aggregator, live_feed, sse_events},
    state::{
        SharedState,
        board::Board,
        leaderboard::Ranking,
        state_machine::{CompetitionEvent, CompetitionPhase, FinishReason},
        transitions::run_transition_with_broadcast,
    },
};

const START_FAILED: &str = "Failed to start competition";
const STOP_FAILED: &str = "Failed to stop competition";
const RESET_FAILED: &str = "Failed to reset competition";
const LOAD_FAILED: &str = "Failed to load competition state";
pub(crate) const FETCH_FAILED: &str = "Failed to fetch leaderboard data";

/// Result of a single countdown step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No run in progress; nothing changed.
    Inactive,
    /// Countdown decremented.
    Ticked { remaining_secs: u64 },
    /// Countdown reached zero and the run was expired.
    Expired,
}

/// What to do with the competition record found on startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MountAction {
    StayIdle,
    ShowFinished(CompetitionRecord),
    Resume {
        record: CompetitionRecord,
        remaining_secs: u64,
    },
    Expire(CompetitionRecord),
}

fn classify(record: Option<CompetitionRecord>, now_ms: i64, duration: Duration) -> MountAction {
    let Some(record) = record else {
        return MountAction::StayIdle;
    };
    if record.is_finished() {
        return MountAction::ShowFinished(record);
    }
    let Some(start_time) = record.running_since() else {
        return MountAction::StayIdle;
    };

    let duration_ms = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
    let remaining_ms = duration_ms.saturating_sub(now_ms.saturating_sub(start_time));
    if remaining_ms <= 0 {
        return MountAction::Expire(record);
    }

    // A start time ahead of the local clock never yields more than the configured duration.
    let remaining_secs = (remaining_ms.min(duration_ms) as u64).div_ceil(1000);
    MountAction::Resume {
        record,
        remaining_secs,
    }
}

async fn surface<T>(
    state: &SharedState,
    result: Result<T, ServiceError>,
    message: &str,
) -> Result<T, ServiceError> {
    match &result {
        Ok(_) => {}
        Err(ServiceError::Unavailable(source)) => {
            warn!(error = %source, "{message}");
            state
                .update_board(|board| board.error = Some(message.to_string()))
                .await;
            sse_events::broadcast_error(state, message);
        }
        Err(ServiceError::InvalidState(reason)) => debug!(reason = %reason, "{message}"),
        Err(err @ ServiceError::Internal(_)) => warn!(error = %err, "{message}"),
    }
    result
}

async fn write_record(state: &SharedState, record: CompetitionRecord) -> Result<(), ServiceError> {
    let value = serde_json::to_value(record)
        .map_err(|err| ServiceError::Internal(format!("failed to encode record: {err}")))?;
    state
        .store()
        .write(state.config().competition_path(), value)
        .await?;
    Ok(())
}

async fn read_record(state: &SharedState) -> Result<Option<CompetitionRecord>, ServiceError> {
    let path = state.config().competition_path();
    let Some(value) = state.store().read(path).await? else {
        return Ok(None);
    };
    let record = serde_json::from_value(value).map_err(|source| StorageError::Malformed {
        path: path.to_string(),
        source,
    })?;
    Ok(Some(record))
}

/// One-shot read of the participants region, aggregated.
pub(crate) async fn read_ranking(state: &SharedState) -> Result<Ranking, ServiceError> {
    let raw = state
        .store()
        .read(state.config().participants_path())
        .await?;
    Ok(aggregator::aggregate(raw.as_ref()))
}

/// Final snapshot for a concluded run. A failed read keeps whatever is on the board.
async fn final_ranking(state: &SharedState) -> Option<Ranking> {
    match read_ranking(state).await {
        Ok(ranking) => Some(ranking),
        Err(err) => {
            warn!(error = %err, "failed to read final leaderboard snapshot");
            None
        }
    }
}

/// Start a new run: persist the active record, reset the countdown and go live.
pub async fn start(state: &SharedState) -> Result<(), ServiceError> {
    let result = run_transition_with_broadcast(state, CompetitionEvent::Start, move || async move {
        let duration = state.config().duration();
        let now = state.now_ms();
        let end_time = now.saturating_add(i64::try_from(duration.as_millis()).unwrap_or(i64::MAX));
        let record = CompetitionRecord::started(now, end_time);

        write_record(state, record).await?;

        let full = state.config().duration_secs();
        state
            .update_board(|board| {
                *board = Board {
                    record: Some(record),
                    ..Board::idle(full)
                }
            })
            .await;
        live_feed::start(state).await;
        info!(start_time = now, end_time, "competition started");
        Ok(())
    })
    .await;

    surface(state, result, START_FAILED).await
}

/// Stop the current run on request.
pub async fn stop(state: &SharedState) -> Result<(), ServiceError> {
    finish(state, FinishReason::ManualStop).await
}

/// Conclude the current run because its countdown ran out.
///
/// Calling this when no run is in progress is a no-op.
pub async fn expire(state: &SharedState) -> Result<(), ServiceError> {
    match finish(state, FinishReason::Expired).await {
        Err(ServiceError::InvalidState(reason)) => {
            debug!(reason = %reason, "competition already concluded");
            Ok(())
        }
        other => other,
    }
}

async fn finish(state: &SharedState, reason: FinishReason) -> Result<(), ServiceError> {
    let result =
        run_transition_with_broadcast(state, CompetitionEvent::Finish(reason), move || async move {
            let now = state.now_ms();
            let start_time = state.board().await.record.and_then(|record| record.start_time);
            let record = CompetitionRecord::finished(start_time, now);

            write_record(state, record).await?;
            state.stop_live().await;

            let ranking = final_ranking(state).await;
            let fetch_failed = ranking.is_none();
            let board = state
                .update_board(|board| {
                    if let Some(ranking) = ranking {
                        board.ranking = ranking;
                        board.error = None;
                    } else {
                        board.error = Some(FETCH_FAILED.to_string());
                    }
                    board.frozen = true;
                    board.countdown_secs = 0;
                    board.record = Some(record);
                    board.clone()
                })
                .await;
            info!(?reason, end_time = now, entries = board.ranking.len(), "competition finished");
            Ok((board, fetch_failed))
        })
        .await;

    let (board, fetch_failed) = surface(state, result, STOP_FAILED).await?;
    if fetch_failed {
        sse_events::broadcast_error(state, FETCH_FAILED);
    }
    sse_events::broadcast_leaderboard(state, &board);
    Ok(())
}

/// Clear the competition record and return to an idle board.
pub async fn reset(state: &SharedState) -> Result<(), ServiceError> {
    let result = run_transition_with_broadcast(state, CompetitionEvent::Reset, move || async move {
        state
            .store()
            .delete(state.config().competition_path())
            .await?;
        let full = state.config().duration_secs();
        let board = state
            .update_board(|board| {
                *board = Board::idle(full);
                board.clone()
            })
            .await;
        info!("competition reset");
        Ok(board)
    })
    .await;

    let board = surface(state, result, RESET_FAILED).await?;
    sse_events::broadcast_leaderboard(state, &board);
    Ok(())
}

/// Pick up the competition record persisted by a previous process, if any.
pub async fn restore(state: &SharedState) -> Result<(), ServiceError> {
    let record = surface(state, read_record(state).await, LOAD_FAILED).await?;
    let action = classify(record, state.now_ms(), state.config().duration());
    debug!(?action, "restoring competition state");

    match action {
        MountAction::StayIdle => Ok(()),
        MountAction::ShowFinished(record) => show_finished(state, record).await,
        MountAction::Resume {
            record,
            remaining_secs,
        } => {
            let result = run_transition_with_broadcast(state, CompetitionEvent::Resume, move || async move {
                state
                    .update_board(|board| {
                        board.record = Some(record);
                        board.countdown_secs = remaining_secs;
                    })
                    .await;
                live_feed::start(state).await;
                info!(remaining_secs, "resumed running competition");
                Ok(())
            })
            .await;
            surface(state, result, LOAD_FAILED).await
        }
        MountAction::Expire(record) => {
            let result = run_transition_with_broadcast(state, CompetitionEvent::Resume, move || async move {
                state
                    .update_board(|board| {
                        board.record = Some(record);
                        board.countdown_secs = 0;
                    })
                    .await;
                Ok(())
            })
            .await;
            surface(state, result, LOAD_FAILED).await?;
            info!("persisted run ran out while offline, expiring it");
            expire(state).await
        }
    }
}

async fn show_finished(state: &SharedState, record: CompetitionRecord) -> Result<(), ServiceError> {
    let result = run_transition_with_broadcast(state, CompetitionEvent::Restore, move || async move {
        let ranking = final_ranking(state).await;
        let fetch_failed = ranking.is_none();
        let board = state
            .update_board(|board| {
                board.ranking = ranking.unwrap_or_default();
                board.error = fetch_failed.then(|| FETCH_FAILED.to_string());
                board.frozen = true;
                board.countdown_secs = 0;
                board.record = Some(record);
                board.clone()
            })
            .await;
        Ok((board, fetch_failed))
    })
    .await;

    let (board, fetch_failed) = surface(state, result, LOAD_FAILED).await?;
    if fetch_failed {
        sse_events::broadcast_error(state, FETCH_FAILED);
    }
    sse_events::broadcast_leaderboard(state, &board);
    Ok(())
}

/// Advance the countdown by one step. Reaching zero stops the ticker and expires the run.
pub async fn tick(state: &SharedState) -> Result<TickOutcome, ServiceError> {
    let remaining_secs = {
        let _gate = state.lock_gate().await;
        if state.phase().await != CompetitionPhase::Running {
            return Ok(TickOutcome::Inactive);
        }
        state
            .update_board(|board| {
                board.countdown_secs = board.countdown_secs.saturating_sub(1);
                board.countdown_secs
            })
            .await
    };

    sse_events::broadcast_countdown(state, remaining_secs);
    if remaining_secs > 0 {
        return Ok(TickOutcome::Ticked { remaining_secs });
    }

    state.release_ticker().await;
    expire(state).await?;
    Ok(TickOutcome::Expired)
}
