//! Worker loop: sleep, pop one pending task, run it outside the lock, migrate.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::task::ErrorCode;

use super::Inner;

pub(super) fn run_worker(inner: Arc<Inner>, worker: usize) {
    tracing::debug!(worker, "worker started");
    while !inner.stop.wait(inner.poll_interval()) {
        let Some(task) = inner.lock_state().pop_pending() else {
            continue;
        };
        let task_id = task.id();
        tracing::debug!(worker, task_id, "running task");

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| task.run())) {
            tracing::error!(
                worker,
                task_id,
                "task panicked: {}",
                panic_message(payload.as_ref())
            );
            task.mark_failed(ErrorCode::Internal);
        }

        inner.settle(task_id, task.as_ref());
    }
    tracing::debug!(worker, "worker stopped");
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_are_readable() {
        let payload = panic::catch_unwind(|| panic!("static message")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "static message");

        let payload = panic::catch_unwind(|| panic!("formatted {}", 42)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "formatted 42");

        let payload = panic::catch_unwind(|| panic::panic_any(7u8)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
