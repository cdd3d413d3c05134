//! `dlsched fetch` – download URLs through an in-process scheduler.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use dlsched_core::config::SchedulerConfig;
use dlsched_core::network::{
    Bearer, ConnectivityEvent, ManualNetworkObserver, NetworkInfo, NetworkState,
};
use dlsched_core::task::{
    DownloadConfig, DownloadTaskFactory, TaskEvent, TaskFactory, TaskId, TaskInfo, TaskStatus,
};
use dlsched_core::transfer::{CurlTransfer, Transfer};
use dlsched_core::Scheduler;

use crate::cli::FetchArgs;

const WAIT_POLL: Duration = Duration::from_millis(200);
const NETWORK_APPLY_TIMEOUT: Duration = Duration::from_secs(2);

pub fn run_fetch(cfg: &SchedulerConfig, args: &FetchArgs) -> Result<()> {
    let dir = match &args.dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;

    let network = Arc::new(NetworkState::new());
    let transfer: Arc<dyn Transfer> = Arc::new(CurlTransfer::default());
    let factory: Arc<dyn TaskFactory> = Arc::new(
        DownloadTaskFactory::new(transfer, Arc::clone(&network)).with_backoff(cfg.backoff()),
    );
    let scheduler = Scheduler::new(cfg, factory, network);
    let threads = args.threads.unwrap_or(cfg.thread_count);
    if !scheduler.create(threads) {
        bail!("could not start scheduler with {} worker thread(s)", threads);
    }

    let connectivity = ManualNetworkObserver::new();
    if scheduler.attach_network_observer(&connectivity) {
        if let Some(bearer) = args.bearer {
            connectivity.emit(ConnectivityEvent::Available {
                bearer: bearer.into(),
                roaming: false,
            });
            wait_for_network(&scheduler, bearer.into());
        }
    }

    let result = queue_and_wait(&scheduler, args, &dir);
    scheduler.destroy();
    let infos = result?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&infos)?);
    } else {
        print_table(&infos);
    }

    let failed = infos
        .iter()
        .filter(|info| info.status == TaskStatus::Failed)
        .count();
    if failed > 0 {
        bail!("{} of {} download(s) failed", failed, infos.len());
    }
    Ok(())
}

fn wait_for_network(scheduler: &Scheduler, bearer: Bearer) {
    let expected = NetworkInfo::from_bearer(bearer, false);
    let deadline = Instant::now() + NETWORK_APPLY_TIMEOUT;
    while scheduler.network_info() != expected && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
}

fn queue_and_wait(
    scheduler: &Scheduler,
    args: &FetchArgs,
    dir: &Path,
) -> Result<Vec<TaskInfo>> {
    let names = destination_names(&args.urls)?;
    let mut ids: Vec<TaskId> = Vec::with_capacity(args.urls.len());
    for (url, file_name) in args.urls.iter().zip(names) {
        let mut config = DownloadConfig::new(url.clone(), dir.join(&file_name))
            .owned_by(args.bundle.clone(), args.uid)
            .with_network(args.network.into(), args.metered, args.roaming);
        config.title = file_name;
        let id = scheduler.add_task(config)?;
        scheduler.install_callback(id, Arc::new(log_event));
        ids.push(id);
    }

    loop {
        let infos: Vec<TaskInfo> = ids
            .iter()
            .filter_map(|id| scheduler.query_as(*id, args.uid))
            .collect();
        if infos.iter().all(|info| !info.status.is_active()) {
            return Ok(infos);
        }
        thread::sleep(WAIT_POLL);
    }
}

fn log_event(id: TaskId, event: TaskEvent) {
    match event {
        TaskEvent::Progress { .. } => {}
        TaskEvent::Complete => tracing::info!(task_id = id, "download complete"),
        TaskEvent::Pause => tracing::info!(task_id = id, "download paused"),
        TaskEvent::Fail(code) => tracing::warn!(task_id = id, ?code, "download failed"),
        TaskEvent::Remove => tracing::info!(task_id = id, "download removed"),
    }
}

/// Last non-empty path segment of `raw`, or `download.bin`.
fn file_name_from_url(raw: &str) -> Result<String> {
    let parsed = url::Url::parse(raw).with_context(|| format!("invalid URL: {}", raw))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => bail!("unsupported URL scheme '{}': {}", other, raw),
    }
    let name = parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .unwrap_or("download.bin");
    Ok(name.to_string())
}

/// One file name per URL. Repeated names get a `_<position>` suffix (1-based)
/// so no two tasks append to the same file.
fn destination_names(urls: &[String]) -> Result<Vec<String>> {
    let mut taken = HashSet::new();
    let mut names = Vec::with_capacity(urls.len());
    for (idx, url) in urls.iter().enumerate() {
        let mut name = file_name_from_url(url)?;
        if !taken.insert(name.clone()) {
            name = format!("{}_{}", name, idx + 1);
            if !taken.insert(name.clone()) {
                bail!("two URLs resolve to the same file name '{}'", name);
            }
        }
        names.push(name);
    }
    Ok(names)
}

fn print_table(infos: &[TaskInfo]) {
    println!(
        "{:<6} {:<10} {:<22} {:<12} {}",
        "ID", "STATUS", "DETAIL", "BYTES", "FILE"
    );
    for info in infos {
        let detail = match info.status {
            TaskStatus::Failed => format!("{:?}", info.error_code).to_lowercase(),
            TaskStatus::Paused => format!("{:?}", info.paused_reason).to_lowercase(),
            _ => "-".to_string(),
        };
        let bytes = match info.total_bytes {
            Some(total) => format!("{}/{}", info.downloaded_bytes, total),
            None => info.downloaded_bytes.to_string(),
        };
        println!(
            "{:<6} {:<10} {:<22} {:<12} {}",
            info.task_id,
            info.status.as_str(),
            detail,
            bytes,
            info.file_name
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_is_last_path_segment() {
        assert_eq!(
            file_name_from_url("https://example.com/pub/file.iso").unwrap(),
            "file.iso"
        );
        assert_eq!(
            file_name_from_url("https://example.com/dir/archive.tar.gz?x=1").unwrap(),
            "archive.tar.gz"
        );
    }

    #[test]
    fn file_name_falls_back_for_bare_host() {
        assert_eq!(
            file_name_from_url("https://example.com/").unwrap(),
            "download.bin"
        );
        assert_eq!(
            file_name_from_url("http://example.com/dir/").unwrap(),
            "dir"
        );
    }

    #[test]
    fn same_file_name_from_different_hosts_gets_distinct_destinations() {
        let urls = vec![
            "http://a.example/x.iso".to_string(),
            "http://b.example/pub/x.iso".to_string(),
            "http://c.example/y.iso".to_string(),
            "http://d.example/x.iso".to_string(),
        ];
        assert_eq!(
            destination_names(&urls).unwrap(),
            vec!["x.iso", "x.iso_2", "y.iso", "x.iso_4"]
        );
    }

    #[test]
    fn suffix_colliding_with_a_real_name_is_rejected() {
        let urls = vec![
            "http://a.example/x.iso".to_string(),
            "http://a.example/x.iso_3".to_string(),
            "http://b.example/x.iso".to_string(),
        ];
        assert!(destination_names(&urls).is_err());
    }

    #[test]
    fn non_http_urls_are_rejected() {
        assert!(file_name_from_url("ftp://example.com/file").is_err());
        assert!(file_name_from_url("not a url").is_err());
    }
}
