//! Registry map and the two queues, guarded together by the scheduler lock.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::SchedulerError;
use crate::queue::TaskQueue;
use crate::task::{Task, TaskId, TaskStatus};

pub(super) struct SchedulerState {
    pub(super) tasks: HashMap<TaskId, Arc<dyn Task>>,
    pub(super) pending: TaskQueue,
    pub(super) paused: TaskQueue,
    pub(super) next_id: TaskId,
}

impl SchedulerState {
    pub(super) fn new() -> Self {
        Self {
            tasks: HashMap::new(),
            pending: TaskQueue::new(),
            paused: TaskQueue::new(),
            next_id: 1,
        }
    }

    /// Hands out the next id. Ids wrap at `u32::MAX`; landing on a live id is an error.
    pub(super) fn allocate_id(&mut self) -> Result<TaskId, SchedulerError> {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        if self.tasks.contains_key(&id) {
            return Err(SchedulerError::DuplicateTaskId(id));
        }
        Ok(id)
    }

    pub(super) fn get(&self, id: TaskId) -> Option<Arc<dyn Task>> {
        self.tasks.get(&id).cloned()
    }

    /// Moves `id` between the queues according to the status its task reports.
    pub(super) fn migrate(&mut self, id: TaskId, status: TaskStatus) {
        match status {
            TaskStatus::Paused => {
                self.pending.remove_if_present(id);
                self.paused.push_if_absent(id);
            }
            TaskStatus::Unqueued => {
                self.paused.remove_if_present(id);
                self.pending.push_if_absent(id);
            }
            TaskStatus::Success | TaskStatus::Failed => {
                self.pending.remove_if_present(id);
                self.paused.remove_if_present(id);
            }
            TaskStatus::Pending | TaskStatus::Running => return,
        }
        tracing::debug!(task_id = id, status = status.as_str(), "queue migration");
    }

    /// Pops pending ids until one still has a registered task.
    pub(super) fn pop_pending(&mut self) -> Option<Arc<dyn Task>> {
        while let Some(id) = self.pending.pop_front() {
            if let Some(task) = self.get(id) {
                return Some(task);
            }
        }
        None
    }

    pub(super) fn erase(&mut self, id: TaskId) -> Option<Arc<dyn Task>> {
        self.pending.remove_if_present(id);
        self.paused.remove_if_present(id);
        self.tasks.remove(&id)
    }
}
