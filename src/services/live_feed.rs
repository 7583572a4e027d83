//! Background tasks alive while a run is in progress: the live subscription on the
//! participants region and the countdown ticker.

use tokio::time::{Instant, interval_at};
use tracing::{debug, info, warn};

use crate::{
    config::COUNTDOWN_TICK,
    dao::score_store::{SnapshotUpdate, Subscription},
    services::{
        aggregator,
        competition_service::{self, FETCH_FAILED, TickOutcome},
        sse_events,
    },
    state::{SharedState, state_machine::CompetitionPhase},
};

/// Subscribe to the participants region and start the countdown ticker.
///
/// Any previous feed is cancelled before subscribing again. A failed subscription leaves
/// the run going with an error on the board; the ticker starts regardless.
pub(crate) async fn start(state: &SharedState) {
    state.cancel_feed().await;

    let path = state.config().participants_path();
    match state.store().subscribe(path).await {
        Ok(subscription) => {
            let feed = tokio::spawn(run_feed(state.clone(), subscription));
            state.replace_feed(feed).await;
            debug!(path = %path, "live feed subscribed");
        }
        Err(err) => {
            warn!(path = %path, error = %err, "failed to subscribe to live scores");
            state
                .update_board(|board| board.error = Some(FETCH_FAILED.to_string()))
                .await;
            sse_events::broadcast_error(state, FETCH_FAILED);
        }
    }

    let ticker = tokio::spawn(run_ticker(state.clone()));
    state.replace_ticker(ticker).await;
}

async fn run_feed(state: SharedState, mut subscription: Subscription) {
    while let Some(update) = subscription.next().await {
        apply_update(&state, update).await;
    }
    info!("live feed ended");
}

async fn apply_update(state: &SharedState, update: SnapshotUpdate) {
    let _gate = state.lock_gate().await;
    if state.phase().await != CompetitionPhase::Running {
        return;
    }

    match update {
        Ok(raw) => {
            let ranking = aggregator::aggregate(raw.as_ref());
            let board = state
                .update_board(|board| {
                    board.ranking = ranking;
                    board.error = None;
                    board.clone()
                })
                .await;
            debug!(entries = board.ranking.len(), "live leaderboard updated");
            sse_events::broadcast_leaderboard(state, &board);
        }
        Err(err) => {
            warn!(error = %err, "live feed reported an error");
            state
                .update_board(|board| board.error = Some(FETCH_FAILED.to_string()))
                .await;
            sse_events::broadcast_error(state, FETCH_FAILED);
        }
    }
}

async fn run_ticker(state: SharedState) {
    let mut interval = interval_at(Instant::now() + COUNTDOWN_TICK, COUNTDOWN_TICK);

    loop {
        interval.tick().await;
        match competition_service::tick(&state).await {
            Ok(TickOutcome::Ticked { .. }) => {}
            Ok(TickOutcome::Expired) => {
                info!("countdown reached zero");
                break;
            }
            Ok(TickOutcome::Inactive) => break,
            Err(err) => {
                warn!(error = %err, "countdown tick failed");
                break;
            }
        }
    }
}
