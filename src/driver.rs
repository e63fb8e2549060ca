use std::num::{NonZeroU64, NonZeroUsize};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use crate::{
    pool::{TaskPool, WaitStrategy},
    primes::RangeWorker,
    types::{range::partition, PrimeSet},
};

pub const DEFAULT_MAX_VAL: u64 = 10_000_000;
pub const DEFAULT_INTERVAL: u64 = 10_000;
pub const DEFAULT_MAX_TASKS: usize = 4;

#[derive(Debug, Clone)]
pub struct Config {
    /// Values in `[0, max_val)` are tested
    pub max_val: u64,
    /// Size of the range given to a single task
    pub interval: NonZeroU64,
    /// Tasks allowed in flight at once. 1 runs the ranges sequentially.
    pub max_tasks: NonZeroUsize,
    pub wait: WaitStrategy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_val: DEFAULT_MAX_VAL,
            interval: NonZeroU64::new(DEFAULT_INTERVAL).unwrap(),
            max_tasks: NonZeroUsize::new(DEFAULT_MAX_TASKS).unwrap(),
            wait: WaitStrategy::default(),
        }
    }
}

#[derive(Debug)]
pub struct Report {
    pub max_val: u64,
    pub elapsed: Duration,
    /// Concatenated in completion order, ascending only within a chunk
    pub primes: PrimeSet,
    pub chunks: usize,
    pub peak_in_flight: usize,
}

impl Report {
    pub fn count(&self) -> usize {
        self.primes.len()
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Tested {} values for primality in {} secs. Found {}",
            self.max_val,
            self.elapsed.as_secs_f64(),
            self.count()
        )
    }
}

/// Tests `[0, max_val)` chunk by chunk, never keeping more than
/// `max_tasks` chunks in flight.
#[instrument(skip_all, fields(
    max_val = config.max_val,
    interval = config.interval.get(),
    max_tasks = config.max_tasks.get(),
))]
pub async fn run<W: RangeWorker>(config: &Config, worker: W) -> Result<Report> {
    let start = Instant::now();
    let mut pool = TaskPool::new(worker, config.max_tasks, config.wait);
    let mut primes = PrimeSet::new();
    let mut chunks = 0;

    for range in partition(config.max_val, config.interval) {
        while pool.is_full() {
            let completed = pool
                .wait_any()
                .await
                .expect("Full pool has tasks in flight")
                .context("Range task failed")?;
            primes.extend(completed.primes);
        }
        pool.submit(range)
            .with_context(|| format!("Couldn't submit range {range}"))?;
        chunks += 1;
    }
    debug!("All {chunks} chunks submitted, draining {} tasks", pool.len());
    primes.extend(pool.drain().await.context("Range task failed")?);

    let report = Report {
        max_val: config.max_val,
        elapsed: start.elapsed(),
        primes,
        chunks,
        peak_in_flight: pool.peak_in_flight(),
    };
    info!(
        "Found {} primes in {} chunks, at most {} in flight, in {:?}",
        report.count(),
        report.chunks,
        report.peak_in_flight,
        report.elapsed
    );
    Ok(report)
}
