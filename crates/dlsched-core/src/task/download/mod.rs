//! Download task: resumable single-stream transfer into a local file.
//!
//! Implements the task contract on top of a [`Transfer`] backend. The task
//! keeps its own status, retries transient failures up to its retry budget,
//! and honors pause/remove requests by aborting the in-flight transfer.

mod backoff;

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::network::{NetworkInfo, NetworkState};
use crate::transfer::{Transfer, TransferError, TransferRequest, TransferSink};

use super::{
    DownloadConfig, ErrorCode, PausedReason, Task, TaskCallback, TaskEvent, TaskFactory, TaskId,
    TaskInfo, TaskState, TaskStatus,
};

pub use backoff::Backoff;

const DEFAULT_RETRY_BUDGET: u32 = 10;
const STOP_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Default)]
struct Progress {
    probed: bool,
    downloaded: u64,
    total: Option<u64>,
    mime_type: String,
}

pub struct DownloadTask {
    id: TaskId,
    config: DownloadConfig,
    transfer: Arc<dyn Transfer>,
    network: Arc<NetworkState>,
    backoff: Backoff,
    state: Mutex<TaskState>,
    progress: Mutex<Progress>,
    /// Set by pause/remove; polled by the transfer to abort.
    stop: AtomicBool,
    removed: AtomicBool,
    retry_budget: AtomicU32,
    notify_app: AtomicBool,
    callback: Mutex<Option<TaskCallback>>,
    /// Serializes overlapping runs (resume while the previous run is still unwinding).
    run_lock: Mutex<()>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl DownloadTask {
    pub fn new(
        id: TaskId,
        config: DownloadConfig,
        transfer: Arc<dyn Transfer>,
        network: Arc<NetworkState>,
        backoff: Backoff,
    ) -> Self {
        Self {
            id,
            config,
            transfer,
            network,
            backoff,
            state: Mutex::new(TaskState::default()),
            progress: Mutex::new(Progress::default()),
            stop: AtomicBool::new(false),
            removed: AtomicBool::new(false),
            retry_budget: AtomicU32::new(DEFAULT_RETRY_BUDGET),
            notify_app: AtomicBool::new(true),
            callback: Mutex::new(None),
            run_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    fn emit(&self, event: TaskEvent) {
        let callback = lock(&self.callback).clone();
        if let Some(cb) = callback {
            cb(self.id, event);
        }
    }

    fn set_state(&self, next: TaskState) {
        let (changed, current) = {
            let mut state = lock(&self.state);
            let changed = state.transition(next);
            (changed, *state)
        };
        if !changed {
            return;
        }
        tracing::debug!(
            task_id = self.id,
            status = current.status.as_str(),
            code = ?current.error_code,
            reason = ?current.paused_reason,
            "task state changed"
        );
        let event = match current.status {
            TaskStatus::Success => Some(TaskEvent::Complete),
            TaskStatus::Paused => Some(TaskEvent::Pause),
            TaskStatus::Failed => Some(TaskEvent::Fail(current.error_code)),
            _ => None,
        };
        if let Some(event) = event {
            self.emit(event);
        }
    }

    fn is_stopping(&self) -> bool {
        self.stop.load(Ordering::Relaxed) || self.removed.load(Ordering::Relaxed)
    }

    fn open_output(&self) -> io::Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.config.file_path)
    }

    fn request(&self) -> TransferRequest<'_> {
        TransferRequest {
            url: &self.config.url,
            headers: &self.config.headers,
        }
    }

    /// Learns size and MIME type once per task.
    fn ensure_probed(&self) -> Result<(), TransferError> {
        if lock(&self.progress).probed {
            return Ok(());
        }
        let probe = self.transfer.probe(&self.request())?;
        let mut progress = lock(&self.progress);
        progress.total = probe.content_length;
        progress.mime_type = probe.content_type.unwrap_or_default();
        progress.probed = true;
        tracing::debug!(task_id = self.id, total = ?progress.total, "probed remote size");
        Ok(())
    }

    fn record_progress(&self, written: u64) {
        let (downloaded, total) = {
            let mut progress = lock(&self.progress);
            progress.downloaded += written;
            (progress.downloaded, progress.total)
        };
        self.emit(TaskEvent::Progress {
            downloaded,
            total,
            notify_app: self.notify_app.load(Ordering::Relaxed),
        });
    }

    /// One fetch attempt, resuming after whatever the file already holds.
    fn transfer_once(&self, file: &mut File) {
        let existing = match file.metadata() {
            Ok(meta) => meta.len(),
            Err(e) => {
                tracing::warn!(task_id = self.id, "stat output file: {}", e);
                self.set_state(TaskState::failed(ErrorCode::FileError));
                return;
            }
        };
        let total = lock(&self.progress).total;
        lock(&self.progress).downloaded = existing;

        let mut resume_from = 0;
        if existing > 0 {
            match total {
                Some(total) if existing >= total => {
                    tracing::info!(task_id = self.id, "download already complete on disk");
                    self.set_state(TaskState::new(TaskStatus::Success));
                    return;
                }
                _ => resume_from = existing,
            }
        }

        let mut sink = FileSink { task: self, file };
        let result = self.transfer.fetch(&self.request(), resume_from, &mut sink);
        self.apply_outcome(result, resume_from > 0);
    }

    fn apply_outcome(&self, result: Result<u32, TransferError>, partial: bool) {
        if self.removed.load(Ordering::Relaxed) {
            tracing::info!(task_id = self.id, "task removed during transfer");
            return;
        }
        let state = self.status();
        if state.status == TaskStatus::Paused
            && state.paused_reason == PausedReason::UserRequested
        {
            tracing::debug!(task_id = self.id, "paused by user; ignoring transfer outcome");
            return;
        }
        match result {
            Ok(200) if !partial => self.set_state(TaskState::new(TaskStatus::Success)),
            Ok(206) if partial => self.set_state(TaskState::new(TaskStatus::Success)),
            Ok(200) => {
                tracing::warn!(task_id = self.id, "server ignored resume offset");
                self.set_state(TaskState::failed(ErrorCode::HttpDataError));
            }
            Ok(code) => {
                tracing::warn!(task_id = self.id, code, "unexpected HTTP status");
                self.set_state(TaskState::failed(ErrorCode::UnhandledHttpCode));
            }
            // pause/pause_for already recorded why the transfer stopped
            Err(TransferError::Aborted) => {}
            Err(TransferError::Storage(e)) => {
                tracing::warn!(task_id = self.id, "write failed: {}", e);
                self.set_state(TaskState::failed(ErrorCode::HttpDataError));
            }
            Err(TransferError::TooManyRedirects) => {
                self.set_state(TaskState::failed(ErrorCode::TooManyRedirects));
            }
            Err(TransferError::Retryable(msg)) => {
                tracing::debug!(task_id = self.id, "transient transfer failure: {}", msg);
                self.set_state(TaskState::new(TaskStatus::Pending));
            }
            Err(TransferError::Protocol(msg)) => {
                tracing::warn!(task_id = self.id, "transfer failed: {}", msg);
                self.set_state(TaskState::failed(ErrorCode::UnhandledHttpCode));
            }
        }
    }

    fn sleep_unless_stopped(&self, delay: Duration) {
        let deadline = Instant::now() + delay;
        while !self.is_stopping() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep((deadline - now).min(STOP_POLL));
        }
    }
}

struct FileSink<'a> {
    task: &'a DownloadTask,
    file: &'a mut File,
}

impl TransferSink for FileSink<'_> {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.file.write_all(data)?;
        self.task.record_progress(data.len() as u64);
        Ok(())
    }

    fn should_abort(&self) -> bool {
        self.task.is_stopping()
    }
}

impl Task for DownloadTask {
    fn id(&self) -> TaskId {
        self.id
    }

    fn run(&self) {
        let _run = lock(&self.run_lock);
        if self.removed.load(Ordering::Relaxed) {
            return;
        }
        match self.status().status {
            TaskStatus::Success | TaskStatus::Paused | TaskStatus::Failed => return,
            _ => {}
        }
        tracing::info!(task_id = self.id, url = %self.config.url, "task start");

        let mut file = match self.open_output() {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(
                    task_id = self.id,
                    path = %self.config.file_path.display(),
                    "open output file: {}",
                    e
                );
                self.set_state(TaskState::failed(ErrorCode::FileError));
                return;
            }
        };

        if !self.network.is_online() {
            tracing::info!(task_id = self.id, "network is offline");
            self.set_state(TaskState::failed(ErrorCode::Offline));
            return;
        }

        self.set_state(TaskState::new(TaskStatus::Running));
        let budget = self.retry_budget.load(Ordering::Relaxed);
        let mut attempts = 0u32;
        loop {
            if !self.is_satisfied_by_network(&self.network.current()) {
                tracing::info!(task_id = self.id, "network does not satisfy task configuration");
                self.pause_for(PausedReason::NetworkUnsatisfied);
                return;
            }
            let status = self.status().status;
            if status != TaskStatus::Running && status != TaskStatus::Pending {
                return;
            }
            match self.ensure_probed() {
                Ok(()) => self.transfer_once(&mut file),
                Err(TransferError::Retryable(msg)) => {
                    tracing::debug!(task_id = self.id, "transient probe failure: {}", msg);
                    self.set_state(TaskState::new(TaskStatus::Pending));
                }
                Err(e) => {
                    tracing::warn!(task_id = self.id, "probe failed: {}", e);
                    self.set_state(TaskState::failed(ErrorCode::HttpDataError));
                    return;
                }
            }

            if self.status().status != TaskStatus::Pending {
                return;
            }
            attempts += 1;
            if attempts >= budget {
                let reason = if self.network.is_online() {
                    PausedReason::WaitingToRetry
                } else {
                    PausedReason::WaitingForNetwork
                };
                tracing::info!(task_id = self.id, attempts, "retry budget exhausted");
                self.set_state(TaskState::paused(reason));
                return;
            }
            self.sleep_unless_stopped(self.backoff.delay(attempts));
        }
    }

    fn pause(&self) -> bool {
        let (changed, allowed) = {
            let mut state = lock(&self.state);
            if !state.status.is_active() {
                (false, false)
            } else {
                self.stop.store(true, Ordering::Relaxed);
                (state.transition(TaskState::paused(PausedReason::UserRequested)), true)
            }
        };
        if changed {
            tracing::info!(task_id = self.id, "paused by user");
            self.emit(TaskEvent::Pause);
        }
        allowed
    }

    fn pause_for(&self, reason: PausedReason) -> bool {
        let (changed, allowed) = {
            let mut state = lock(&self.state);
            if state.status.is_active() {
                self.stop.store(true, Ordering::Relaxed);
                (state.transition(TaskState::paused(reason)), true)
            } else if state.status == TaskStatus::Paused {
                (state.transition(TaskState::paused(reason)), true)
            } else {
                (false, false)
            }
        };
        if changed {
            tracing::info!(task_id = self.id, ?reason, "paused by scheduler");
            self.emit(TaskEvent::Pause);
        }
        allowed
    }

    fn resume(&self) -> bool {
        let state = self.status();
        let resumable = state.status == TaskStatus::Paused
            || (state.status == TaskStatus::Failed && state.error_code == ErrorCode::CannotResume);
        if !resumable {
            return false;
        }
        self.stop.store(false, Ordering::Relaxed);
        if self.network.is_online() {
            self.set_state(TaskState::new(TaskStatus::Unqueued));
        } else {
            self.set_state(TaskState::failed(ErrorCode::CannotResume));
        }
        true
    }

    fn remove(&self) -> bool {
        tracing::info!(task_id = self.id, status = self.status().status.as_str(), "remove task");
        self.removed.store(true, Ordering::Relaxed);
        self.stop.store(true, Ordering::Relaxed);
        self.emit(TaskEvent::Remove);
        true
    }

    fn mark_failed(&self, code: ErrorCode) {
        self.set_state(TaskState::failed(code));
    }

    fn status(&self) -> TaskState {
        *lock(&self.state)
    }

    fn is_satisfied_by_network(&self, info: &NetworkInfo) -> bool {
        self.config.is_satisfied_by(info)
    }

    fn set_notify_app(&self, notify: bool) {
        self.notify_app.store(notify, Ordering::Relaxed);
    }

    fn is_notify_app(&self) -> bool {
        self.notify_app.load(Ordering::Relaxed)
    }

    fn owner_uid(&self) -> u32 {
        self.config.owner_uid
    }

    fn owner_bundle_name(&self) -> String {
        self.config.owner_bundle_name.clone()
    }

    fn set_retry_budget(&self, budget: u32) {
        self.retry_budget.store(budget, Ordering::Relaxed);
    }

    fn install_callback(&self, callback: TaskCallback) {
        *lock(&self.callback) = Some(callback);
    }

    fn query(&self) -> TaskInfo {
        let mut info = TaskInfo::from_config(self.id, &self.config, self.status());
        let progress = lock(&self.progress);
        info.downloaded_bytes = progress.downloaded;
        info.total_bytes = progress.total;
        info
    }

    fn query_mime_type(&self) -> String {
        lock(&self.progress).mime_type.clone()
    }
}

/// Creates [`DownloadTask`]s sharing one transfer backend and network snapshot.
pub struct DownloadTaskFactory {
    transfer: Arc<dyn Transfer>,
    network: Arc<NetworkState>,
    backoff: Backoff,
}

impl DownloadTaskFactory {
    pub fn new(transfer: Arc<dyn Transfer>, network: Arc<NetworkState>) -> Self {
        Self {
            transfer,
            network,
            backoff: Backoff::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }
}

impl TaskFactory for DownloadTaskFactory {
    fn create_task(&self, id: TaskId, config: DownloadConfig) -> Arc<dyn Task> {
        Arc::new(DownloadTask::new(
            id,
            config,
            Arc::clone(&self.transfer),
            Arc::clone(&self.network),
            self.backoff,
        ))
    }
}
