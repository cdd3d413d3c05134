pub mod app_state;
pub mod config;
pub mod error;
pub mod logging;
pub mod network;
pub mod observer;
pub mod queue;
pub mod scheduler;
pub mod task;
pub mod transfer;

pub use error::{RegistrationError, SchedulerError};
pub use scheduler::{QueueSnapshot, Scheduler};
