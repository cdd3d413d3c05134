//! Insertion-ordered set of task ids.
//!
//! Backs the scheduler's pending and paused queues. Each id is tagged with a
//! monotonically increasing admission sequence; the sequence index keeps FIFO
//! order and the presence map gives O(1) membership checks, so push-if-absent
//! and remove-if-present never rotate the whole queue.

use std::collections::{BTreeMap, HashMap};

use crate::task::TaskId;

/// FIFO of task ids with set semantics (no duplicate membership).
#[derive(Debug, Default, Clone)]
pub struct TaskQueue {
    order: BTreeMap<u64, TaskId>,
    index: HashMap<TaskId, u64>,
    next_seq: u64,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.index.contains_key(&id)
    }

    /// Appends `id` at the tail. Returns false (and leaves the queue untouched)
    /// if `id` is already queued.
    pub fn push_if_absent(&mut self, id: TaskId) -> bool {
        if self.index.contains_key(&id) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, id);
        self.index.insert(id, seq);
        true
    }

    /// Removes `id` wherever it sits. Returns false if it was not queued.
    pub fn remove_if_present(&mut self, id: TaskId) -> bool {
        match self.index.remove(&id) {
            Some(seq) => {
                self.order.remove(&seq);
                true
            }
            None => false,
        }
    }

    pub fn pop_front(&mut self) -> Option<TaskId> {
        let (_, id) = self.order.pop_first()?;
        self.index.remove(&id);
        Some(id)
    }

    pub fn front(&self) -> Option<TaskId> {
        self.order.values().next().copied()
    }

    /// Ids in FIFO order.
    pub fn iter(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.order.values().copied()
    }

    pub fn to_vec(&self) -> Vec<TaskId> {
        self.iter().collect()
    }
}
