//! App-state-awareness monitor: keeps each task's notify flag in step with its owner app.

use std::sync::Arc;

use crate::app_state::{AppStateEvent, AppStateObserver};
use crate::task::Task;

use super::events::start_monitor;
use super::Scheduler;

impl Scheduler {
    /// Subscribes to app lifecycle changes. Returns false if the subscription fails.
    /// Like the network monitor, it has to be attached again after a restart.
    pub fn attach_app_state_observer(&self, observer: &dyn AppStateObserver) -> bool {
        if !self.is_initialized() {
            tracing::warn!("app-state observer attached before scheduler start");
            return false;
        }
        let started = start_monitor(
            self,
            "dlsched-app-state",
            |callback| observer.register_on_app_state_changed(callback),
            |scheduler, event: AppStateEvent| scheduler.apply_app_state_event(&event),
        );
        match started {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("app-state monitor disabled: {}", e);
                false
            }
        }
    }

    pub fn apply_app_state_event(&self, event: &AppStateEvent) {
        let Some(notify) = event.notify_app() else {
            return;
        };
        let tasks: Vec<Arc<dyn Task>> = self.inner.lock_state().tasks.values().cloned().collect();
        let mut matched = 0usize;
        for task in tasks {
            if task.owner_uid() == event.uid && task.owner_bundle_name() == event.bundle_name {
                task.set_notify_app(notify);
                matched += 1;
            }
        }
        tracing::debug!(
            bundle = %event.bundle_name,
            uid = event.uid,
            notify,
            matched,
            "app state changed"
        );
    }
}
