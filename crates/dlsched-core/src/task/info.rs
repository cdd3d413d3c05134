//! Read-only task snapshot returned by the query operations.

use serde::Serialize;

use super::config::{AllowedNetwork, DownloadConfig};
use super::state::{ErrorCode, PausedReason, TaskState, TaskStatus};
use super::TaskId;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskInfo {
    pub task_id: TaskId,
    pub url: String,
    pub file_name: String,
    pub file_dir: String,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub error_code: ErrorCode,
    pub paused_reason: PausedReason,
    pub downloaded_bytes: u64,
    pub total_bytes: Option<u64>,
    pub network: AllowedNetwork,
    pub metered: bool,
    pub roaming: bool,
}

impl TaskInfo {
    /// Snapshot with no transfer progress yet.
    pub fn from_config(task_id: TaskId, config: &DownloadConfig, state: TaskState) -> Self {
        let file_name = config
            .file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_dir = config
            .file_path
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            task_id,
            url: config.url.clone(),
            file_name,
            file_dir,
            title: config.title.clone(),
            description: config.description.clone(),
            status: state.status,
            error_code: state.error_code,
            paused_reason: state.paused_reason,
            downloaded_bytes: 0,
            total_bytes: None,
            network: config.network,
            metered: config.metered,
            roaming: config.roaming,
        }
    }
}
