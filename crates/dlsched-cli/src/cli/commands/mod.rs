//! CLI command handlers, one file per command.

mod completions;
mod config;
mod fetch;

pub use completions::{run_completions, run_manpage};
pub use config::run_config;
pub use fetch::run_fetch;
