/// Display model driven by the competition controller.
pub mod board;
/// Wall-clock sources.
pub mod clock;
/// Score records and rankings.
pub mod leaderboard;
mod sse;
/// Plan/apply/abort competition lifecycle.
pub mod state_machine;
/// Transition helpers broadcasting phase changes.
pub mod transitions;

use std::sync::Arc;

use tokio::{
    sync::{Mutex, MutexGuard, RwLock},
    task::{self, JoinHandle},
};
use tracing::{debug, warn};

use crate::{
    config::AppConfig,
    dao::score_store::ScoreStore,
    error::ServiceError,
    state::{board::Board, clock::Clock, state_machine::CompetitionPhase},
};

pub use self::sse::SseHub;
pub use self::state_machine::{AbortError, ApplyError, Plan, PlanError, PlanId};
use self::state_machine::{CompetitionEvent, CompetitionStateMachine};

/// Reference-counted handle to the application state.
pub type SharedState = Arc<AppState>;

const SSE_CAPACITY: usize = 16;

/// Background tasks alive while a run is in progress: at most one of each.
#[derive(Default)]
struct LiveHandles {
    feed: Option<JoinHandle<()>>,
    ticker: Option<JoinHandle<()>>,
}

/// Central application state: the shared store handle, the competition state machine and
/// the board it drives.
pub struct AppState {
    store: Arc<dyn ScoreStore>,
    config: AppConfig,
    clock: Arc<dyn Clock>,
    sse: SseHub,
    competition: RwLock<CompetitionStateMachine>,
    board: RwLock<Board>,
    live: Mutex<LiveHandles>,
    transition_gate: Mutex<()>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The competition starts idle; call the restore operation to pick up a persisted run.
    pub fn new(store: Arc<dyn ScoreStore>, config: AppConfig, clock: Arc<dyn Clock>) -> SharedState {
        let board = Board::idle(config.duration_secs());
        Arc::new(Self {
            store,
            config,
            clock,
            sse: SseHub::new(SSE_CAPACITY),
            competition: RwLock::new(CompetitionStateMachine::new()),
            board: RwLock::new(board),
            live: Mutex::new(LiveHandles::default()),
            transition_gate: Mutex::new(()),
        })
    }

    /// Handle to the shared store.
    pub fn store(&self) -> Arc<dyn ScoreStore> {
        self.store.clone()
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Current wall-clock time in epoch milliseconds.
    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        &self.sse
    }

    /// Current phase of the competition state machine.
    pub async fn phase(&self) -> CompetitionPhase {
        self.competition.read().await.phase()
    }

    /// Copy of the board as currently displayed.
    pub async fn board(&self) -> Board {
        self.board.read().await.clone()
    }

    /// Mutate the board. Reserved to the competition service.
    pub(crate) async fn update_board<R>(&self, update: impl FnOnce(&mut Board) -> R) -> R {
        let mut board = self.board.write().await;
        update(&mut board)
    }

    /// Serialise a step with every other transition, tick and live update.
    ///
    /// Must not be held while calling [`AppState::run_transition`].
    pub(crate) async fn lock_gate(&self) -> MutexGuard<'_, ()> {
        self.transition_gate.lock().await
    }

    /// Install the task consuming the live subscription, cancelling any previous one.
    pub(crate) async fn replace_feed(&self, feed: JoinHandle<()>) {
        let mut live = self.live.lock().await;
        if let Some(previous) = live.feed.replace(feed) {
            debug!("cancelling previous live feed");
            previous.abort();
        }
    }

    /// Cancel the live subscription, if any.
    pub(crate) async fn cancel_feed(&self) {
        if let Some(feed) = self.live.lock().await.feed.take() {
            feed.abort();
        }
    }

    /// Install the countdown ticker, cancelling any previous one.
    pub(crate) async fn replace_ticker(&self, ticker: JoinHandle<()>) {
        let mut live = self.live.lock().await;
        if let Some(previous) = live.ticker.replace(ticker) {
            debug!("cancelling previous ticker");
            previous.abort();
        }
    }

    /// Forget the installed ticker when the caller is that ticker, so it can finish its last
    /// step without being aborted. Any other caller leaves the handle in place.
    pub(crate) async fn release_ticker(&self) {
        let Some(current) = task::try_id() else {
            return;
        };
        let mut live = self.live.lock().await;
        if live.ticker.as_ref().is_some_and(|ticker| ticker.id() == current) {
            live.ticker.take();
        }
    }

    /// Cancel the live subscription and stop the countdown ticker.
    pub(crate) async fn stop_live(&self) {
        let mut live = self.live.lock().await;
        if let Some(feed) = live.feed.take() {
            feed.abort();
        }
        if let Some(ticker) = live.ticker.take() {
            ticker.abort();
        }
    }

    /// True while a live feed or ticker is installed.
    pub async fn has_live_tasks(&self) -> bool {
        let live = self.live.lock().await;
        live.feed.is_some() || live.ticker.is_some()
    }

    /// Stop every background task so nothing updates the board after shutdown.
    pub async fn teardown(&self) {
        self.stop_live().await;
        debug!("competition background tasks stopped");
    }

    /// Plan a transition to the shared state machine, returning the plan.
    async fn plan_transition(&self, event: CompetitionEvent) -> Result<Plan, PlanError> {
        let mut sm = self.competition.write().await;
        sm.plan(event)
    }

    /// Apply the planned transition to the shared state machine, returning the next phase.
    async fn apply_planned_transition(
        &self,
        plan_id: PlanId,
    ) -> Result<CompetitionPhase, ApplyError> {
        let mut sm = self.competition.write().await;
        sm.apply(plan_id)
    }

    /// Abort a planned transition of the shared state machine.
    async fn abort_transition(&self, plan_id: PlanId) -> Result<(), AbortError> {
        let mut sm = self.competition.write().await;
        sm.abort(plan_id)
    }

    /// Run `work` between planning and applying `event`.
    ///
    /// The whole sequence holds the transition gate. When `work` fails the plan is aborted
    /// and the phase stays where it was.
    pub async fn run_transition<F, Fut, T>(
        &self,
        event: CompetitionEvent,
        work: F,
    ) -> Result<(T, CompetitionPhase), ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, ServiceError>>,
    {
        let gate = self.transition_gate.lock().await;
        let Plan { id: plan_id, .. } = self.plan_transition(event).await?;

        match work().await {
            Ok(value) => {
                let next = self.apply_planned_transition(plan_id).await?;
                drop(gate);
                Ok((value, next))
            }
            Err(err) => {
                if let Err(abort_err) = self.abort_transition(plan_id).await {
                    warn!(
                        event = ?event,
                        plan_id = %plan_id,
                        error = ?abort_err,
                        "failed to abort transition after work error"
                    );
                }
                drop(gate);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::oneshot;

    use super::*;
    use crate::{dao::score_store::memory::MemoryScoreStore, state::clock::ManualClock};

    fn state() -> SharedState {
        AppState::new(
            Arc::new(MemoryScoreStore::new()),
            AppConfig::new(Duration::from_secs(10)),
            Arc::new(ManualClock::new(0)),
        )
    }

    #[tokio::test]
    async fn foreign_caller_does_not_release_installed_ticker() {
        let state = state();
        let ticker = tokio::spawn(std::future::pending::<()>());
        state.replace_ticker(ticker).await;

        state.release_ticker().await;

        assert!(state.has_live_tasks().await);
        state.teardown().await;
    }

    #[tokio::test]
    async fn stale_ticker_leaves_current_ticker_installed() {
        let state = state();
        let (go, wait) = oneshot::channel::<()>();
        let stale = tokio::spawn({
            let state = state.clone();
            async move {
                let _ = wait.await;
                state.release_ticker().await;
            }
        });
        let current = tokio::spawn(std::future::pending::<()>());
        state.replace_ticker(current).await;

        go.send(()).unwrap();
        stale.await.unwrap();

        assert!(state.has_live_tasks().await);
        state.teardown().await;
    }

    #[tokio::test]
    async fn ticker_releases_itself() {
        let state = state();
        let (go, wait) = oneshot::channel::<()>();
        let (done, released) = oneshot::channel::<bool>();
        let ticker = tokio::spawn({
            let state = state.clone();
            async move {
                let _ = wait.await;
                state.release_ticker().await;
                let _ = done.send(state.has_live_tasks().await);
            }
        });
        state.replace_ticker(ticker).await;

        go.send(()).unwrap();

        assert!(!released.await.unwrap());
    }
}
