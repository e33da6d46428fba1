use std::fmt;

use sandworm_errors::{SchedulerError, SchedulerResult};

use crate::value_objects::ContainerHandle;

/// Remote log tags, one per lifecycle event.
pub mod tags {
    pub const PULL: &str = "scheduler/pull";
    pub const PULL_START: &str = "scheduler/pull/start";
    pub const PULL_NEXT: &str = "scheduler/pull/next";
    pub const PULL_ERROR: &str = "scheduler/pull/error";
    pub const PULL_DONE: &str = "scheduler/pull/done";
    pub const PULL_CLOSE: &str = "scheduler/pull/close";
    pub const RUN_START: &str = "scheduler/run/onStart";
    pub const RUN_NEXT: &str = "scheduler/run/onNext";
    pub const RUN_ERROR: &str = "scheduler/run/onError";
    pub const RUN_COMPLETE: &str = "scheduler/run/onComplete";
    pub const RUN_CLOSE: &str = "scheduler/run/close";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Pull,
    Run,
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecyclePhase::Pull => write!(f, "pull"),
            LifecyclePhase::Run => write!(f, "run"),
        }
    }
}

/// State of one dispatched job.
///
/// ```text
/// Pulling --pull ok--> Running(None) --started--> Running(Some) --wait ok--> Completed
///    |                      |                          |
///    +--pull err--> Failed(Pull)   +------run err------+--> Failed(Run)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    Pulling,
    Running {
        container: Option<ContainerHandle>,
    },
    Completed {
        container: ContainerHandle,
        status_code: Option<i64>,
    },
    Failed {
        phase: LifecyclePhase,
        reason: String,
    },
}

impl LifecycleState {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleState::Pulling => "pulling",
            LifecycleState::Running { .. } => "running",
            LifecycleState::Completed { .. } => "completed",
            LifecycleState::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LifecycleState::Completed { .. } | LifecycleState::Failed { .. }
        )
    }

    /// Whether reaching this state hands the worker back to the pool.
    ///
    /// A failed pull keeps the worker out of the pool and drops the job.
    /// That matches the long-standing behavior of the service and is kept
    /// until someone decides otherwise.
    pub fn releases_worker(&self) -> bool {
        match self {
            LifecycleState::Completed { .. } => true,
            LifecycleState::Failed { phase, .. } => *phase == LifecyclePhase::Run,
            _ => false,
        }
    }

    pub fn on_pull_complete(self) -> SchedulerResult<Self> {
        match self {
            LifecycleState::Pulling => Ok(LifecycleState::Running { container: None }),
            other => Err(illegal(&other, "pull complete")),
        }
    }

    pub fn on_pull_error(self, reason: impl Into<String>) -> SchedulerResult<Self> {
        match self {
            LifecycleState::Pulling => Ok(LifecycleState::Failed {
                phase: LifecyclePhase::Pull,
                reason: reason.into(),
            }),
            other => Err(illegal(&other, "pull error")),
        }
    }

    pub fn on_container_started(self, container: ContainerHandle) -> SchedulerResult<Self> {
        match self {
            LifecycleState::Running { container: None } => Ok(LifecycleState::Running {
                container: Some(container),
            }),
            other => Err(illegal(&other, "container started")),
        }
    }

    pub fn on_wait_complete(self, status_code: Option<i64>) -> SchedulerResult<Self> {
        match self {
            LifecycleState::Running {
                container: Some(container),
            } => Ok(LifecycleState::Completed {
                container,
                status_code,
            }),
            other => Err(illegal(&other, "wait complete")),
        }
    }

    /// Create, start and wait failures all land here.
    pub fn on_run_error(self, reason: impl Into<String>) -> SchedulerResult<Self> {
        match self {
            LifecycleState::Running { .. } => Ok(LifecycleState::Failed {
                phase: LifecyclePhase::Run,
                reason: reason.into(),
            }),
            other => Err(illegal(&other, "run error")),
        }
    }
}

fn illegal(state: &LifecycleState, event: &str) -> SchedulerError {
    SchedulerError::internal(format!(
        "illegal lifecycle transition: '{event}' in state '{}'",
        state.name()
    ))
}
