//! Synthetic workload runner.
//!
//! Drives a shared [`CacheManager`] from several concurrent workers with a
//! skewed key distribution (most requests hit a small hot set), then prints
//! the resulting statistics.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::adapters::InMemoryRemoteTier;
use crate::cli::output::{output, stats_table, write_back_table, CommandOutput};
use crate::domain::models::{
    Config, RemoteBackend, StatsSnapshot, WriteBackSnapshot, WriteStrategy,
};
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::setup;
use crate::services::CacheManager;

#[derive(Args, Debug)]
pub struct WorkloadArgs {
    /// Total number of requests to issue
    #[arg(long, default_value_t = 10_000)]
    pub requests: u64,

    /// Number of distinct keys
    #[arg(long, default_value_t = 2_000)]
    pub keys: u64,

    /// Concurrent workers sharing one cache
    #[arg(long, default_value_t = 4)]
    pub workers: usize,

    /// Every Nth request overwrites its key instead of reading it (0 disables)
    #[arg(long, default_value_t = 10)]
    pub write_every: u64,

    /// Memory tier capacity (overrides cache.l1_capacity)
    #[arg(long)]
    pub capacity: Option<usize>,

    /// Entry TTL in seconds (overrides cache.default_ttl_secs)
    #[arg(long)]
    pub ttl_secs: Option<u64>,

    /// Write strategy (overrides cache.default_strategy)
    #[arg(long)]
    pub strategy: Option<WriteStrategy>,

    /// Remote tier (overrides remote.backend)
    #[arg(long, value_enum)]
    pub remote: Option<RemoteChoice>,

    /// Artificial latency added to every call of the in-process remote tier
    #[arg(long, default_value_t = 0)]
    pub remote_latency_ms: u64,

    /// Remote call timeout in milliseconds (overrides remote.timeout_ms)
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RemoteChoice {
    /// Memory tier only
    None,
    /// In-process remote tier
    Memory,
}

impl WorkloadArgs {
    /// Fold command-line overrides into the loaded configuration.
    fn apply(&self, mut config: Config) -> Config {
        if let Some(capacity) = self.capacity {
            config.cache.l1_capacity = capacity;
        }
        if let Some(ttl) = self.ttl_secs {
            config.cache.default_ttl_secs = ttl;
        }
        if let Some(strategy) = self.strategy {
            config.cache.default_strategy = strategy;
        }
        match self.remote {
            Some(RemoteChoice::None) => config.remote.backend = RemoteBackend::None,
            Some(RemoteChoice::Memory) => config.remote.backend = RemoteBackend::Memory,
            None => {}
        }
        if self.timeout_ms.is_some() {
            config.remote.timeout_ms = self.timeout_ms;
        }
        config
    }
}

#[derive(Debug, Serialize)]
pub struct WorkloadReport {
    pub requests: u64,
    pub keys: u64,
    pub workers: usize,
    pub strategy: WriteStrategy,
    pub remote: RemoteBackend,
    pub elapsed_ms: u64,
    pub requests_per_sec: f64,
    pub stats: StatsSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_back: Option<WriteBackSnapshot>,
}

impl CommandOutput for WorkloadReport {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!(
                "Workload: {} requests over {} keys ({} workers, {}, remote: {})",
                self.requests,
                self.keys,
                self.workers,
                self.strategy,
                backend_label(self.remote)
            ),
            format!(
                "Elapsed: {}ms ({:.0} req/s)",
                self.elapsed_ms, self.requests_per_sec
            ),
            String::new(),
            stats_table(&self.stats).to_string(),
        ];
        if let Some(ref write_back) = self.write_back {
            lines.push(String::new());
            lines.push("Write-back:".to_string());
            lines.push(write_back_table(write_back).to_string());
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

const fn backend_label(backend: RemoteBackend) -> &'static str {
    match backend {
        RemoteBackend::None => "none",
        RemoteBackend::Memory => "memory",
        RemoteBackend::Redis => "redis",
    }
}

/// Deterministic skewed key choice: four in five requests land in the
/// hottest fifth of the key space.
pub const fn key_index(request: u64, keys: u64) -> u64 {
    let keys = if keys == 0 { 1 } else { keys };
    let hot = if keys / 5 == 0 { 1 } else { keys / 5 };
    if request % 5 < 4 {
        request.wrapping_mul(2_654_435_761) % hot
    } else {
        request.wrapping_mul(40_503) % keys
    }
}

async fn build_manager(args: &WorkloadArgs, config: &Config) -> Result<CacheManager<String>> {
    if config.remote.backend != RemoteBackend::Memory {
        return setup::build_manager(config).await;
    }

    let timeout = config
        .remote
        .timeout()
        .context("a remote timeout is required; pass --timeout-ms")?;
    let tier =
        InMemoryRemoteTier::new().with_latency(Duration::from_millis(args.remote_latency_ms));

    CacheManager::builder()
        .capacity(config.cache.l1_capacity)
        .default_ttl(config.cache.default_ttl())
        .default_strategy(config.cache.default_strategy)
        .write_back_queue(config.write_back.queue_capacity)
        .remote_tier(Arc::new(tier), timeout)
        .build()
        .context("Failed to build cache manager")
}

async fn run_worker(
    manager: Arc<CacheManager<String>>,
    worker: usize,
    args: Arc<WorkloadArgs>,
    progress: ProgressBar,
) {
    let step = args.workers.max(1);
    for request in (worker as u64..args.requests).step_by(step) {
        let key = format!("item:{}", key_index(request, args.keys));
        let overwrite = args.write_every > 0 && request % args.write_every == 0;

        if overwrite || manager.get(&key).await.is_none() {
            manager.set(key, format!("payload-{request}")).await;
        }
        progress.inc(1);
    }
}

fn progress_bar(len: u64, json_mode: bool) -> Result<ProgressBar> {
    if json_mode {
        return Ok(ProgressBar::hidden());
    }
    let bar = ProgressBar::new(len);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    Ok(bar)
}

pub async fn execute(args: WorkloadArgs, config: Config, json_mode: bool) -> Result<()> {
    let report = run(args, config, json_mode).await?;
    output(&report, json_mode);
    Ok(())
}

/// Run the workload and collect its report.
pub async fn run(args: WorkloadArgs, config: Config, json_mode: bool) -> Result<WorkloadReport> {
    let config = args.apply(config);
    ConfigLoader::validate(&config)?;

    let manager = Arc::new(build_manager(&args, &config).await?);
    let args = Arc::new(args);
    let progress = progress_bar(args.requests, json_mode)?;

    tracing::info!(
        requests = args.requests,
        keys = args.keys,
        workers = args.workers,
        strategy = %config.cache.default_strategy,
        "starting workload"
    );

    let started = Instant::now();
    let workers = (0..args.workers.max(1)).map(|worker| {
        tokio::spawn(run_worker(
            Arc::clone(&manager),
            worker,
            Arc::clone(&args),
            progress.clone(),
        ))
    });
    for joined in futures::future::join_all(workers).await {
        joined.context("workload worker panicked")?;
    }
    let write_back = manager.shutdown(config.write_back.shutdown).await;
    let elapsed = started.elapsed();
    progress.finish_with_message("done");

    #[allow(clippy::cast_precision_loss)]
    let requests_per_sec = if elapsed.is_zero() {
        0.0
    } else {
        args.requests as f64 / elapsed.as_secs_f64()
    };

    Ok(WorkloadReport {
        requests: args.requests,
        keys: args.keys,
        workers: args.workers.max(1),
        strategy: config.cache.default_strategy,
        remote: config.remote.backend,
        elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        requests_per_sec,
        stats: manager.stats(),
        write_back,
    })
}
