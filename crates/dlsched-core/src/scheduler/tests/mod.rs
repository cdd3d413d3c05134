//! Scheduler tests driven by scripted stub tasks.

mod lifecycle;

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use super::*;
use crate::task::{ErrorCode, PausedReason, TaskEvent, TaskState, TaskStatus};

/// What `run` does.
#[derive(Debug, Clone, Copy)]
enum Behavior {
    Succeed,
    Fail,
    Panic,
}

struct StubTask {
    id: TaskId,
    config: DownloadConfig,
    behavior: Behavior,
    removable: bool,
    state: Mutex<TaskState>,
    notify_app: AtomicBool,
    retry_budget: AtomicU32,
    runs: AtomicUsize,
    callback: Mutex<Option<TaskCallback>>,
}

impl StubTask {
    fn set(&self, next: TaskState) -> bool {
        self.state.lock().unwrap().transition(next)
    }
}

impl Task for StubTask {
    fn id(&self) -> TaskId {
        self.id
    }

    fn run(&self) {
        self.runs.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Succeed => {
                self.set(TaskState::new(TaskStatus::Success));
            }
            Behavior::Fail => {
                self.set(TaskState::failed(ErrorCode::UnhandledHttpCode));
            }
            Behavior::Panic => panic!("stub task {} blew up", self.id),
        }
    }

    fn pause(&self) -> bool {
        if !self.status().status.is_active() {
            return false;
        }
        self.set(TaskState::paused(PausedReason::UserRequested));
        true
    }

    fn pause_for(&self, reason: PausedReason) -> bool {
        let status = self.status().status;
        if !status.is_active() && status != TaskStatus::Paused {
            return false;
        }
        self.set(TaskState::paused(reason));
        true
    }

    fn resume(&self) -> bool {
        if self.status().status != TaskStatus::Paused {
            return false;
        }
        self.set(TaskState::new(TaskStatus::Unqueued));
        true
    }

    fn remove(&self) -> bool {
        let callback = self.callback.lock().unwrap().clone();
        if let Some(cb) = callback {
            cb(self.id, TaskEvent::Remove);
        }
        self.removable
    }

    fn mark_failed(&self, code: ErrorCode) {
        self.set(TaskState::failed(code));
    }

    fn status(&self) -> TaskState {
        *self.state.lock().unwrap()
    }

    fn is_satisfied_by_network(&self, info: &crate::network::NetworkInfo) -> bool {
        self.config.is_satisfied_by(info)
    }

    fn set_notify_app(&self, notify: bool) {
        self.notify_app.store(notify, Ordering::SeqCst);
    }

    fn is_notify_app(&self) -> bool {
        self.notify_app.load(Ordering::SeqCst)
    }

    fn owner_uid(&self) -> u32 {
        self.config.owner_uid
    }

    fn owner_bundle_name(&self) -> String {
        self.config.owner_bundle_name.clone()
    }

    fn set_retry_budget(&self, budget: u32) {
        self.retry_budget.store(budget, Ordering::SeqCst);
    }

    fn install_callback(&self, callback: TaskCallback) {
        *self.callback.lock().unwrap() = Some(callback);
    }

    fn query(&self) -> TaskInfo {
        TaskInfo::from_config(self.id, &self.config, self.status())
    }

    fn query_mime_type(&self) -> String {
        "application/octet-stream".to_string()
    }
}

/// Creates stub tasks; the behavior is picked from the URL ("panic", "fail", else succeed).
struct StubFactory {
    removable: bool,
    created: Mutex<Vec<Arc<StubTask>>>,
}

impl StubFactory {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            removable: true,
            created: Mutex::new(Vec::new()),
        })
    }

    fn refusing_removal() -> Arc<Self> {
        Arc::new(Self {
            removable: false,
            created: Mutex::new(Vec::new()),
        })
    }

    fn task(&self, id: TaskId) -> Arc<StubTask> {
        self.created
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .expect("task was created")
    }
}

impl TaskFactory for StubFactory {
    fn create_task(&self, id: TaskId, config: DownloadConfig) -> Arc<dyn Task> {
        let behavior = if config.url.contains("panic") {
            Behavior::Panic
        } else if config.url.contains("fail") {
            Behavior::Fail
        } else {
            Behavior::Succeed
        };
        let task = Arc::new(StubTask {
            id,
            config,
            behavior,
            removable: self.removable,
            state: Mutex::new(TaskState::default()),
            notify_app: AtomicBool::new(true),
            retry_budget: AtomicU32::new(0),
            runs: AtomicUsize::new(0),
            callback: Mutex::new(None),
        });
        self.created.lock().unwrap().push(Arc::clone(&task));
        task
    }
}

const IDLE_POLL: Duration = Duration::from_secs(3600);

/// Started scheduler; with `poll` = [`IDLE_POLL`] the workers never pick anything up.
fn started(factory: &Arc<StubFactory>, threads: usize, poll: Duration) -> Scheduler {
    let config = SchedulerConfig {
        poll_interval_ms: poll.as_millis() as u64,
        retry_budget: 3,
        ..SchedulerConfig::default()
    };
    let scheduler = Scheduler::new(
        &config,
        Arc::clone(factory) as Arc<dyn TaskFactory>,
        Arc::new(NetworkState::new()),
    );
    assert!(scheduler.create(threads));
    scheduler
}

fn download(name: &str, uid: u32) -> DownloadConfig {
    DownloadConfig::new(format!("http://example.test/{}", name), format!("/tmp/{}", name))
        .owned_by("com.example.app", uid)
}

fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

/// Pending/paused are disjoint and terminal tasks sit in neither.
fn assert_queue_invariants(scheduler: &Scheduler) {
    let snapshot = scheduler.queue_snapshot();
    for id in &snapshot.pending {
        assert!(!snapshot.paused.contains(id), "task {} in both queues", id);
    }
    for info in scheduler.query_all() {
        if info.status.is_terminal() {
            assert!(!snapshot.pending.contains(&info.task_id));
            assert!(!snapshot.paused.contains(&info.task_id));
        }
    }
}
