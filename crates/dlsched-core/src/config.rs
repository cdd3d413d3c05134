use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::task::Backoff;

/// Backoff between retryable transfer attempts (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_secs: 0.25,
            max_delay_secs: 30,
        }
    }
}

/// Scheduler configuration loaded from `~/.config/dlsched/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Number of worker threads started by `Scheduler::create`.
    pub thread_count: usize,
    /// How long each worker sleeps before polling the pending queue.
    pub poll_interval_ms: u64,
    /// Retry budget handed to every new task.
    pub retry_budget: u32,
    /// Optional backoff tuning; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            thread_count: 4,
            poll_interval_ms: 1000,
            retry_budget: 10,
            retry: None,
        }
    }
}

impl SchedulerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Backoff used by download tasks between retryable attempts.
    /// Base delays that do not fit a `Duration` are clamped to the max delay.
    pub fn backoff(&self) -> Backoff {
        let retry = self.retry.clone().unwrap_or_default();
        let max_delay = Duration::from_secs(retry.max_delay_secs);
        let base_delay = Duration::try_from_secs_f64(retry.base_delay_secs.max(0.0))
            .unwrap_or(max_delay)
            .min(max_delay);
        Backoff {
            base_delay,
            max_delay,
        }
    }

    /// Rejects values that parse as TOML but cannot drive the scheduler.
    pub fn validate(&self) -> Result<()> {
        if let Some(retry) = &self.retry {
            let base = retry.base_delay_secs;
            if Duration::try_from_secs_f64(base).is_err() {
                bail!(
                    "retry.base_delay_secs must be a non-negative number of seconds (got {})",
                    base
                );
            }
        }
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("dlsched")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<SchedulerConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = SchedulerConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: SchedulerConfig = toml::from_str(&data)?;
    cfg.validate().with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}
