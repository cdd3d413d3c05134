//! `dlsched config` – show config path and effective values.

use anyhow::Result;
use dlsched_core::config::{self, SchedulerConfig};

pub fn run_config(cfg: &SchedulerConfig) -> Result<()> {
    let path = config::config_path()?;
    let backoff = cfg.backoff();
    println!("config file:      {}", path.display());
    println!("thread_count:     {}", cfg.thread_count);
    println!("poll_interval_ms: {}", cfg.poll_interval_ms);
    println!("retry_budget:     {}", cfg.retry_budget);
    println!(
        "retry backoff:    {:?} base, {:?} max{}",
        backoff.base_delay,
        backoff.max_delay,
        if cfg.retry.is_none() { " (defaults)" } else { "" }
    );
    Ok(())
}
