//! The schedulable unit of work and its control contract.
//!
//! The scheduler only talks to tasks through [`Task`]. A task owns its own
//! transfer logic, retry loop, and status; the scheduler reads the status after
//! every control call and moves the task id between its queues accordingly.

mod config;
mod download;
mod info;
mod state;

use std::sync::Arc;

pub use config::{AllowedNetwork, DownloadConfig};
pub use download::{Backoff, DownloadTask, DownloadTaskFactory};
pub use info::TaskInfo;
pub use state::{ErrorCode, PausedReason, TaskState, TaskStatus};

use crate::network::NetworkInfo;

/// Task identifier, assigned by the scheduler.
pub type TaskId = u32;

/// Notification delivered to an installed task callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEvent {
    Progress {
        downloaded: u64,
        total: Option<u64>,
        /// Whether the owning app currently wants progress surfaced.
        notify_app: bool,
    },
    Complete,
    Pause,
    Fail(ErrorCode),
    Remove,
}

pub type TaskCallback = Arc<dyn Fn(TaskId, TaskEvent) + Send + Sync>;

/// Control contract between the scheduler and a task.
///
/// All methods take `&self`: `run` executes on a worker thread while the
/// control methods are called concurrently from clients and monitors.
pub trait Task: Send + Sync {
    fn id(&self) -> TaskId;

    /// Blocks until the task succeeds, fails, or ends up paused.
    fn run(&self);

    /// User pause. Returns false if the task cannot be paused from its current status.
    fn pause(&self) -> bool;

    /// Scheduler-driven pause (e.g. network no longer satisfies the task).
    /// Must not replace an existing user pause reason.
    fn pause_for(&self, reason: PausedReason) -> bool;

    /// Makes a paused task runnable again (status back to `Unqueued`) on success.
    fn resume(&self) -> bool;

    /// Cooperative cancel. Returns true once the task has accepted removal.
    fn remove(&self) -> bool;

    /// Forces the task into `Failed` (used when `run` panics).
    fn mark_failed(&self, code: ErrorCode);

    fn status(&self) -> TaskState;

    fn is_satisfied_by_network(&self, info: &NetworkInfo) -> bool;

    fn set_notify_app(&self, notify: bool);

    fn is_notify_app(&self) -> bool;

    fn owner_uid(&self) -> u32;

    fn owner_bundle_name(&self) -> String;

    fn set_retry_budget(&self, budget: u32);

    fn install_callback(&self, callback: TaskCallback);

    fn query(&self) -> TaskInfo;

    fn query_mime_type(&self) -> String;
}

/// Builds tasks for `Scheduler::add_task`.
pub trait TaskFactory: Send + Sync {
    fn create_task(&self, id: TaskId, config: DownloadConfig) -> Arc<dyn Task>;
}
