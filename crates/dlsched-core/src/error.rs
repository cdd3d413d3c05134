//! Error types surfaced by the scheduler and its observer sources.

use crate::task::TaskId;

/// Admission errors returned by `Scheduler::add_task`.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("scheduler is not initialized")]
    NotInitialized,
    #[error("task id {0} is already in use")]
    DuplicateTaskId(TaskId),
}

/// Failure to subscribe to a network or app-state event source.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("subscription rejected: {0}")]
    Rejected(String),
    #[error("spawn monitor thread: {0}")]
    Spawn(#[from] std::io::Error),
}
