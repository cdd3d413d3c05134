//! Task status, paused reason, and error code.

use serde::Serialize;

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created or resumed, waiting in the pending queue.
    Unqueued,
    /// Transient failure inside a run; the run will retry.
    Pending,
    Running,
    Paused,
    Success,
    Failed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Unqueued => "unqueued",
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Paused => "paused",
            TaskStatus::Success => "success",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Failed)
    }

    /// True while the task still wants a worker (queued or mid-run).
    pub fn is_active(self) -> bool {
        matches!(
            self,
            TaskStatus::Unqueued | TaskStatus::Pending | TaskStatus::Running
        )
    }
}

/// Why a task is paused. Only meaningful while the status is `Paused`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PausedReason {
    #[default]
    None,
    UserRequested,
    NetworkUnsatisfied,
    /// Retry budget ran out on transient failures.
    WaitingToRetry,
    /// Retry budget ran out while the device was offline.
    WaitingForNetwork,
    Other,
}

/// Failure detail reported alongside the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    #[default]
    None,
    /// For task implementations with no more specific code.
    Unknown,
    /// Resume requested while offline.
    CannotResume,
    /// Output file could not be opened or inspected.
    FileError,
    /// Probe failed, the body could not be stored, or the server ignored the resume offset.
    HttpDataError,
    TooManyRedirects,
    UnhandledHttpCode,
    /// Run started while offline.
    Offline,
    /// Generic code for a run that panicked.
    Internal,
}

/// Status triple reported by `Task::status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaskState {
    pub status: TaskStatus,
    pub error_code: ErrorCode,
    pub paused_reason: PausedReason,
}

impl TaskState {
    pub fn new(status: TaskStatus) -> Self {
        Self {
            status,
            error_code: ErrorCode::None,
            paused_reason: PausedReason::None,
        }
    }

    pub fn paused(reason: PausedReason) -> Self {
        Self {
            status: TaskStatus::Paused,
            error_code: ErrorCode::None,
            paused_reason: reason,
        }
    }

    pub fn failed(code: ErrorCode) -> Self {
        Self {
            status: TaskStatus::Failed,
            error_code: code,
            paused_reason: PausedReason::None,
        }
    }

    /// Applies `next`, keeping a user pause reason if `next` is another pause.
    /// A paused task only leaves `Paused` for `Unqueued` or a terminal status.
    /// Returns true if anything changed.
    pub fn transition(&mut self, next: TaskState) -> bool {
        let mut next = next;
        if self.status == TaskStatus::Paused
            && matches!(next.status, TaskStatus::Pending | TaskStatus::Running)
        {
            return false;
        }
        if self.paused_reason == PausedReason::UserRequested && next.status == TaskStatus::Paused {
            next.paused_reason = PausedReason::UserRequested;
        }
        if *self == next {
            return false;
        }
        *self = next;
        true
    }
}

impl Default for TaskState {
    fn default() -> Self {
        Self::new(TaskStatus::Unqueued)
    }
}
