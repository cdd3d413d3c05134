//! Network-awareness monitor.

use std::sync::Arc;

use crate::network::{ConnectivityEvent, NetworkInfo, NetworkObserver};
use crate::task::{PausedReason, Task, TaskStatus};

use super::events::start_monitor;
use super::Scheduler;

impl Scheduler {
    /// Subscribes to connectivity changes. Returns false (and keeps running
    /// without automatic network reactions) if the subscription fails.
    /// `destroy` ends the subscription; attach again after the next `create`.
    pub fn attach_network_observer(&self, observer: &dyn NetworkObserver) -> bool {
        if !self.is_initialized() {
            tracing::warn!("network observer attached before scheduler start");
            return false;
        }
        let started = start_monitor(
            self,
            "dlsched-network",
            |callback| observer.register_on_network_change(callback),
            |scheduler, event: ConnectivityEvent| scheduler.apply_network_event(event),
        );
        match started {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("network monitor disabled: {}", e);
                false
            }
        }
    }

    /// Applies one connectivity change: updates the shared snapshot and, when a
    /// network became available, resumes and re-evaluates tasks against it.
    pub fn apply_network_event(&self, event: ConnectivityEvent) {
        match event {
            ConnectivityEvent::Available { bearer, roaming } => {
                let info = NetworkInfo::from_bearer(bearer, roaming);
                self.inner.network.set_available(info);
                tracing::info!(
                    network_type = ?info.network_type,
                    metered = info.is_metered,
                    roaming = info.is_roaming,
                    "network available"
                );
                self.resume_network_paused(&info);
                self.pause_unsatisfied(&info);
            }
            ConnectivityEvent::Lost => {
                self.inner.network.set_lost();
                tracing::info!("network lost");
            }
        }
    }

    /// Resumes paused tasks the user did not pause and the new network can serve.
    fn resume_network_paused(&self, info: &NetworkInfo) {
        let paused: Vec<Arc<dyn Task>> = {
            let state = self.inner.lock_state();
            state.paused.iter().filter_map(|id| state.get(id)).collect()
        };
        for task in paused {
            let current = task.status();
            if current.status != TaskStatus::Paused
                || current.paused_reason == PausedReason::UserRequested
                || !task.is_satisfied_by_network(info)
            {
                continue;
            }
            if task.resume() {
                tracing::debug!(task_id = task.id(), "resumed after network change");
                self.inner.settle(task.id(), task.as_ref());
            }
        }
    }

    /// Full pass over the registry: pauses every live task the network no longer satisfies.
    fn pause_unsatisfied(&self, info: &NetworkInfo) {
        let tasks: Vec<Arc<dyn Task>> = self.inner.lock_state().tasks.values().cloned().collect();
        for task in tasks {
            let status = task.status().status;
            if status.is_terminal() || task.is_satisfied_by_network(info) {
                continue;
            }
            if task.pause_for(PausedReason::NetworkUnsatisfied) {
                tracing::debug!(task_id = task.id(), "paused: network unsatisfied");
                self.inner.settle(task.id(), task.as_ref());
            }
        }
    }
}
