//! Application lifecycle notifications.

use crate::error::RegistrationError;
use crate::observer::{EventCallback, ManualSource};

/// Lifecycle state carried by an app-state notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Ready,
    Foreground,
    Focused,
    Background,
    Terminated,
}

/// One process/ability state change for an application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppStateEvent {
    pub bundle_name: String,
    pub uid: u32,
    pub state: LifecycleState,
}

impl AppStateEvent {
    pub fn new(bundle_name: impl Into<String>, uid: u32, state: LifecycleState) -> Self {
        Self {
            bundle_name: bundle_name.into(),
            uid,
            state,
        }
    }

    /// Notify flag this event asks for, or `None` if the state is ignored.
    pub fn notify_app(&self) -> Option<bool> {
        match self.state {
            LifecycleState::Foreground => Some(true),
            LifecycleState::Background | LifecycleState::Terminated => Some(false),
            _ => None,
        }
    }
}

pub type AppStateCallback = EventCallback<AppStateEvent>;

/// Source of device-wide app lifecycle notifications.
pub trait AppStateObserver: Send + Sync {
    fn register_on_app_state_changed(
        &self,
        callback: AppStateCallback,
    ) -> Result<(), RegistrationError>;
}

pub type ManualAppStateObserver = ManualSource<AppStateEvent>;

impl AppStateObserver for ManualSource<AppStateEvent> {
    fn register_on_app_state_changed(
        &self,
        callback: AppStateCallback,
    ) -> Result<(), RegistrationError> {
        self.register(callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_foreground_background_and_terminated_matter() {
        let ev = |state| AppStateEvent::new("com.example", 1, state);
        assert_eq!(ev(LifecycleState::Foreground).notify_app(), Some(true));
        assert_eq!(ev(LifecycleState::Background).notify_app(), Some(false));
        assert_eq!(ev(LifecycleState::Terminated).notify_app(), Some(false));
        assert_eq!(ev(LifecycleState::Created).notify_app(), None);
        assert_eq!(ev(LifecycleState::Focused).notify_app(), None);
        assert_eq!(ev(LifecycleState::Ready).notify_app(), None);
    }
}
