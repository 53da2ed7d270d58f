//! CPU benchmark: count primes below a limit by trial division, with the
//! range split across blocking worker tasks and joined once at the end.

use crate::config::{BenchConfig, MAX_BENCH_WORKERS};
use std::time::{Duration, Instant};
use tokio::task::JoinError;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct BenchReport {
    pub workers: usize,
    pub limit: u64,
    pub primes: u64,
    pub elapsed: Duration,
}

impl BenchReport {
    /// Numbers tested per second.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64().max(1e-9);
        self.limit as f64 / secs
    }

    pub fn summary(&self) -> String {
        format!(
            "bench       {} workers, primes {} below {}, {:.3}s, {:.0} numbers/s",
            self.workers,
            self.primes,
            self.limit,
            self.elapsed.as_secs_f64(),
            self.throughput()
        )
    }
}

pub async fn run(cfg: &BenchConfig) -> Result<BenchReport, JoinError> {
    let limit = cfg.prime_limit;
    let ranges = split_range(limit, cfg.resolve_workers());
    let workers = ranges.len();
    debug!(workers, limit, ?ranges, "benchmark starting");

    let started = Instant::now();
    let tasks: Vec<_> = ranges
        .into_iter()
        .map(|(lo, hi)| tokio::task::spawn_blocking(move || count_primes(lo, hi)))
        .collect();

    let mut primes = 0;
    for task in tasks {
        primes += task.await?;
    }
    let elapsed = started.elapsed();

    info!(workers, limit, primes, elapsed_ms = elapsed.as_millis() as u64, "benchmark finished");
    Ok(BenchReport {
        workers,
        limit,
        primes,
        elapsed,
    })
}

/// Splits `[0, limit)` into contiguous ranges whose sizes differ by at most
/// one. `parts` is clamped to `1..=limit`, so no range is empty unless
/// `limit` is zero.
pub fn split_range(limit: u64, parts: usize) -> Vec<(u64, u64)> {
    let parts = u64::try_from(parts).unwrap_or(u64::MAX).clamp(1, limit.max(1));
    let base = limit / parts;
    let extra = limit % parts;

    let mut out = Vec::with_capacity(parts.min(MAX_BENCH_WORKERS as u64) as usize);
    let mut lo = 0;
    for i in 0..parts {
        let len = base + u64::from(i < extra);
        out.push((lo, lo + len));
        lo += len;
    }
    out
}

pub fn count_primes(lo: u64, hi: u64) -> u64 {
    (lo..hi).filter(|&n| is_prime(n)).count() as u64
}

pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n < 4 {
        return true;
    }
    if n % 2 == 0 {
        return false;
    }
    let mut d = 3;
    while d * d <= n {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}
