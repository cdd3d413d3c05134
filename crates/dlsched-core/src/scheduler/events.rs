//! Monitor plumbing: observer callbacks only enqueue; one thread per monitor applies.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crate::error::RegistrationError;
use crate::observer::EventCallback;

use super::Scheduler;

/// How often an idle monitor thread checks the stop signal.
const EVENT_POLL: Duration = Duration::from_millis(50);

/// Subscribes through `register` and starts a thread that feeds every event to `apply`.
pub(super) fn start_monitor<E, R>(
    scheduler: &Scheduler,
    name: &str,
    register: R,
    apply: fn(&Scheduler, E),
) -> Result<(), RegistrationError>
where
    E: Send + 'static,
    R: FnOnce(EventCallback<E>) -> Result<(), RegistrationError>,
{
    let (tx, rx) = mpsc::channel::<E>();
    // the receiver is gone once the scheduler is destroyed; the source then unsubscribes us
    register(Box::new(move |event| tx.send(event).is_ok()))?;

    let monitor = scheduler.clone();
    let handle = thread::Builder::new()
        .name(name.to_string())
        .spawn(move || loop {
            if monitor.inner.stop.is_set() {
                break;
            }
            match rx.recv_timeout(EVENT_POLL) {
                Ok(event) => apply(&monitor, event),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        })?;
    scheduler.inner.lock_monitors().push(handle);
    tracing::info!(monitor = name, "monitor started");
    Ok(())
}
