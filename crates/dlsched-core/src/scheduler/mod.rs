//! Task registry, pending/paused queues, and the worker pool.
//!
//! One lock guards the registry map together with both queues. Task control
//! calls (`run`, `pause`, `resume`, `remove`) are always made with that lock
//! released: the task is looked up, the lock dropped, the call made, and the
//! lock re-taken to migrate the id according to the status the task reports
//! afterwards. Callbacks fired from inside a task may therefore call back into
//! the scheduler.
//!
//! The network and app-state monitors are plain event consumers (see
//! [`Scheduler::attach_network_observer`]); they use the same primitives.

mod app_state;
mod events;
mod network;
mod state;
mod stop;
mod worker;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::network::{NetworkInfo, NetworkState};
use crate::task::{DownloadConfig, Task, TaskCallback, TaskFactory, TaskId, TaskInfo};

use state::SchedulerState;
use stop::StopSignal;

/// Queue membership at one instant, in FIFO order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub pending: Vec<TaskId>,
    pub paused: Vec<TaskId>,
}

/// Cheap to clone; all clones drive the same scheduler.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<SchedulerState>,
    factory: Arc<dyn TaskFactory>,
    network: Arc<NetworkState>,
    poll_interval_ms: AtomicU64,
    retry_budget: u32,
    initialized: AtomicBool,
    stop: StopSignal,
    workers: Mutex<Vec<JoinHandle<()>>>,
    monitors: Mutex<Vec<JoinHandle<()>>>,
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_monitors(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.monitors.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.load(Ordering::Relaxed))
    }

    /// Re-reads the task's status and migrates its id, unless it was removed meanwhile.
    fn settle(&self, id: TaskId, task: &dyn Task) {
        let status = task.status().status;
        let mut state = self.lock_state();
        if state.tasks.contains_key(&id) {
            state.migrate(id, status);
        }
    }

    /// Looks up `id` and checks that `uid` owns it.
    fn owned_task(&self, id: TaskId, uid: u32) -> Option<Arc<dyn Task>> {
        let task = self.lock_state().get(id)?;
        if task.owner_uid() != uid {
            tracing::warn!(task_id = id, uid, "caller does not own task");
            return None;
        }
        Some(task)
    }
}

fn join_all(handles: Vec<JoinHandle<()>>) {
    let current = thread::current().id();
    for handle in handles {
        // destroy() may run on a monitor thread (from an event callback)
        if handle.thread().id() == current {
            continue;
        }
        let name = handle.thread().name().unwrap_or("<unnamed>").to_string();
        if handle.join().is_err() {
            tracing::warn!(thread = %name, "scheduler thread panicked");
        }
    }
}

impl Scheduler {
    pub fn new(
        config: &SchedulerConfig,
        factory: Arc<dyn TaskFactory>,
        network: Arc<NetworkState>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(SchedulerState::new()),
                factory,
                network,
                poll_interval_ms: AtomicU64::new(config.poll_interval_ms),
                retry_budget: config.retry_budget,
                initialized: AtomicBool::new(false),
                stop: StopSignal::default(),
                workers: Mutex::new(Vec::new()),
                monitors: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Starts `thread_count` workers. Returns false for zero threads, when
    /// already running, or when a worker thread cannot be spawned.
    pub fn create(&self, thread_count: usize) -> bool {
        if thread_count == 0 {
            tracing::warn!("refusing to start scheduler with zero worker threads");
            return false;
        }
        let mut workers = self.inner.workers.lock().unwrap_or_else(PoisonError::into_inner);
        if self.inner.initialized.load(Ordering::SeqCst) {
            return false;
        }
        self.inner.stop.reset();
        for worker in 0..thread_count {
            let inner = Arc::clone(&self.inner);
            let spawned = thread::Builder::new()
                .name(format!("dlsched-worker-{}", worker))
                .spawn(move || worker::run_worker(inner, worker));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    tracing::error!(worker, "spawn worker thread: {}", e);
                    self.inner.stop.signal();
                    join_all(std::mem::take(&mut *workers));
                    return false;
                }
            }
        }
        self.inner.initialized.store(true, Ordering::SeqCst);
        tracing::info!(threads = thread_count, "scheduler started");
        true
    }

    /// Stops workers and monitors and joins them. In-flight runs finish first.
    /// Registered tasks stay queryable.
    pub fn destroy(&self) {
        let workers = {
            let mut workers = self.inner.workers.lock().unwrap_or_else(PoisonError::into_inner);
            if !self.inner.initialized.swap(false, Ordering::SeqCst) {
                return;
            }
            self.inner.stop.signal();
            std::mem::take(&mut *workers)
        };
        join_all(workers);
        let monitors = std::mem::take(&mut *self.inner.lock_monitors());
        join_all(monitors);
        tracing::info!("scheduler destroyed");
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::SeqCst)
    }

    /// Creates a task from `config` and appends it to the pending queue.
    pub fn add_task(&self, config: DownloadConfig) -> Result<TaskId, SchedulerError> {
        if !self.is_initialized() {
            return Err(SchedulerError::NotInitialized);
        }
        let mut state = self.inner.lock_state();
        let id = state.allocate_id()?;
        let uid = config.owner_uid;
        let task = self.inner.factory.create_task(id, config);
        task.set_retry_budget(self.inner.retry_budget);
        state.tasks.insert(id, task);
        state.pending.push_if_absent(id);
        tracing::info!(task_id = id, uid, "task added");
        Ok(id)
    }

    pub fn install_callback(&self, id: TaskId, callback: TaskCallback) -> bool {
        let Some(task) = self.inner.lock_state().get(id) else {
            return false;
        };
        task.install_callback(callback);
        true
    }

    pub fn pause(&self, id: TaskId, uid: u32) -> bool {
        let Some(task) = self.inner.owned_task(id, uid) else {
            return false;
        };
        if !task.pause() {
            tracing::debug!(task_id = id, "task refused pause");
            return false;
        }
        self.inner.settle(id, task.as_ref());
        true
    }

    pub fn resume(&self, id: TaskId, uid: u32) -> bool {
        let Some(task) = self.inner.owned_task(id, uid) else {
            return false;
        };
        if !task.resume() {
            tracing::debug!(task_id = id, "task refused resume");
            return false;
        }
        self.inner.settle(id, task.as_ref());
        true
    }

    /// Cooperative cancel; the task leaves the registry only if it accepts removal.
    pub fn remove(&self, id: TaskId, uid: u32) -> bool {
        let Some(task) = self.inner.owned_task(id, uid) else {
            return false;
        };
        if !task.remove() {
            tracing::debug!(task_id = id, "task refused removal");
            return false;
        }
        self.inner.lock_state().erase(id);
        tracing::info!(task_id = id, uid, "task removed");
        true
    }

    /// Administrative lookup without an ownership check.
    pub fn query(&self, id: TaskId) -> Option<TaskInfo> {
        let task = self.inner.lock_state().get(id)?;
        Some(task.query())
    }

    pub fn query_as(&self, id: TaskId, uid: u32) -> Option<TaskInfo> {
        self.inner.owned_task(id, uid).map(|task| task.query())
    }

    /// Every registered task, ordered by id.
    pub fn query_all(&self) -> Vec<TaskInfo> {
        let tasks: Vec<Arc<dyn Task>> = self.inner.lock_state().tasks.values().cloned().collect();
        let mut infos: Vec<TaskInfo> = tasks.iter().map(|task| task.query()).collect();
        infos.sort_by_key(|info| info.task_id);
        infos
    }

    pub fn query_mime_type(&self, id: TaskId, uid: u32) -> Option<String> {
        self.inner
            .owned_task(id, uid)
            .map(|task| task.query_mime_type())
    }

    pub fn set_poll_interval(&self, interval: Duration) {
        let ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self.inner.poll_interval_ms.store(ms, Ordering::Relaxed);
    }

    pub fn poll_interval(&self) -> Duration {
        self.inner.poll_interval()
    }

    pub fn is_online(&self) -> bool {
        self.inner.network.is_online()
    }

    pub fn network_info(&self) -> NetworkInfo {
        self.inner.network.current()
    }

    pub fn queue_snapshot(&self) -> QueueSnapshot {
        let state = self.inner.lock_state();
        QueueSnapshot {
            pending: state.pending.to_vec(),
            paused: state.paused.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests;
