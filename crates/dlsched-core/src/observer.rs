//! In-process event source used for the network and app-state observers.

use std::sync::{Mutex, PoisonError};

use crate::error::RegistrationError;

/// Returns false once the subscriber is gone; the source then drops the callback.
pub type EventCallback<E> = Box<dyn Fn(E) -> bool + Send + Sync>;

/// Keeps registered callbacks and hands every emitted event to all of them.
pub struct ManualSource<E> {
    callbacks: Mutex<Vec<EventCallback<E>>>,
    accepting: bool,
}

impl<E: Clone> ManualSource<E> {
    pub fn new() -> Self {
        Self {
            callbacks: Mutex::new(Vec::new()),
            accepting: true,
        }
    }

    /// A source whose registrations always fail (service not available).
    pub fn unavailable() -> Self {
        Self {
            callbacks: Mutex::new(Vec::new()),
            accepting: false,
        }
    }

    pub fn register(&self, callback: EventCallback<E>) -> Result<(), RegistrationError> {
        if !self.accepting {
            return Err(RegistrationError::Rejected(
                "event source is not available".to_string(),
            ));
        }
        self.lock().push(callback);
        Ok(())
    }

    pub fn emit(&self, event: E) {
        self.lock().retain(|callback| callback(event.clone()));
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<EventCallback<E>>> {
        self.callbacks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E: Clone> Default for ManualSource<E> {
    fn default() -> Self {
        Self::new()
    }
}
