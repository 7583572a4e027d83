use std::time::Instant;

use thiserror::Error;
use uuid::Uuid;

/// Lifecycle phases of a competition run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompetitionPhase {
    /// No run in progress; the countdown shows the full configured duration.
    Idle,
    /// Countdown ticking and live leaderboard updates flowing.
    Running,
    /// Run concluded; the final ranking is frozen.
    Completed,
}

/// Indicates why a running competition concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// Countdown reached zero.
    Expired,
    /// Operator stopped the run early.
    ManualStop,
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompetitionEvent {
    /// Operator starts a new run.
    Start,
    /// An in-progress run found in the shared store is picked up again.
    Resume,
    /// A concluded run found in the shared store is displayed again.
    Restore,
    /// The running competition ends.
    Finish(FinishReason),
    /// Clear the concluded run and return to idle.
    Reset,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: CompetitionPhase,
    /// The event that cannot be applied from this phase.
    pub event: CompetitionEvent,
}

/// Errors that can occur when planning a state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A transition is already pending and must be applied or aborted.
    AlreadyPending,
    /// The requested transition is not valid from the current phase.
    InvalidTransition(InvalidTransition),
}

/// Errors that can occur when applying a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
    /// State machine phase changed since the plan was created.
    PhaseMismatch {
        /// Phase when plan was created.
        expected: CompetitionPhase,
        /// Current phase.
        actual: CompetitionPhase,
    },
    /// State machine version changed since the plan was created.
    VersionMismatch {
        /// Version when plan was created.
        expected: usize,
        /// Current version.
        actual: usize,
    },
}

/// Errors that can occur when aborting a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
}

/// Unique identifier for a planned state transition.
pub type PlanId = Uuid;

/// A planned state machine transition that has been validated but not yet applied.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,
    /// Phase the state machine is currently in.
    pub from: CompetitionPhase,
    /// Phase the state machine will transition to.
    pub to: CompetitionPhase,
    /// Event that triggered this transition.
    pub event: CompetitionEvent,
    /// Version number after applying this transition.
    pub version_next: usize,
    /// Timestamp when this plan was created.
    pub pending_since: Instant,
}

/// Snapshot of the current state machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    /// Current phase of the state machine.
    pub phase: CompetitionPhase,
    /// Version number of the state machine (increments on each transition).
    pub version: usize,
    /// Pending transition phase, if a transition is planned but not yet applied.
    pub pending: Option<CompetitionPhase>,
}

/// State machine guarding the competition lifecycle.
///
/// Transitions are two-step: [`plan`](Self::plan) validates the event, the caller performs
/// the side effects (store writes), then [`apply`](Self::apply) commits or
/// [`abort`](Self::abort) discards the plan, leaving the phase untouched.
#[derive(Debug, Clone)]
pub struct CompetitionStateMachine {
    phase: CompetitionPhase,
    version: usize,
    pending: Option<Plan>,
}

impl Default for CompetitionStateMachine {
    fn default() -> Self {
        Self {
            phase: CompetitionPhase::Idle,
            version: 0,
            pending: None,
        }
    }
}

impl CompetitionStateMachine {
    /// Create a new state machine initialised in the idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> CompetitionPhase {
        self.phase
    }

    /// Create a snapshot of the current state machine state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            version: self.version,
            pending: self.pending.as_ref().map(|plan| plan.to),
        }
    }

    /// Plan a transition by validating that the event can be applied from the current phase.
    /// Returns a Plan that can later be applied or aborted.
    pub fn plan(&mut self, event: CompetitionEvent) -> Result<Plan, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let next = self
            .compute_transition(event)
            .map_err(PlanError::InvalidTransition)?;

        let plan = Plan {
            id: Uuid::new_v4(),
            from: self.phase,
            to: next,
            event,
            version_next: self.version + 1,
            pending_since: Instant::now(),
        };

        self.pending = Some(plan.clone());

        Ok(plan)
    }

    /// Apply a planned transition, moving the state machine to the next phase.
    /// Returns the new phase after the transition.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<CompetitionPhase, ApplyError> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            let expected_plan_id = plan.id;
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected: expected_plan_id,
                got: plan_id,
            });
        }

        if self.phase != plan.from {
            return Err(ApplyError::PhaseMismatch {
                expected: plan.from,
                actual: self.phase,
            });
        }

        if self.version + 1 != plan.version_next {
            return Err(ApplyError::VersionMismatch {
                expected: plan.version_next,
                actual: self.version + 1,
            });
        }

        self.phase = plan.to;
        self.version = plan.version_next;

        Ok(self.phase)
    }

    /// Abort a planned transition without applying it, returning the state machine to its previous state.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        let plan = self.pending.as_ref().ok_or(AbortError::NoPending)?;

        if plan.id != plan_id {
            return Err(AbortError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        self.pending = None;
        Ok(())
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(
        &self,
        event: CompetitionEvent,
    ) -> Result<CompetitionPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (CompetitionPhase::Idle, CompetitionEvent::Start | CompetitionEvent::Resume) => {
                CompetitionPhase::Running
            }
            (CompetitionPhase::Idle, CompetitionEvent::Restore) => CompetitionPhase::Completed,
            (CompetitionPhase::Running, CompetitionEvent::Finish(_)) => CompetitionPhase::Completed,
            (CompetitionPhase::Completed, CompetitionEvent::Reset) => CompetitionPhase::Idle,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}
