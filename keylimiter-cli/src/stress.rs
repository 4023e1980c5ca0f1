//! Stress mode
//!
//! Worker threads share one limiter and fire a random mix of operations at a
//! pool of keys. Roughly:
//!
//! - 70% `allow`
//! - 15% `remaining`
//! - 10% `retry_after`
//! - 5% `limit`
//!
//! One call in ten uses a fresh key outside the pool, so the store keeps
//! churning through keys that are never seen again.

use crate::config::StressConfig;
use anyhow::{Result, anyhow};
use keylimiter::KeyLimiter;
use rand::Rng;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const ORPHAN_KEY_PERCENT: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Allow,
    Remaining,
    RetryAfter,
    Limit,
}

impl Operation {
    fn pick(rng: &mut impl Rng) -> Self {
        match rng.gen_range(0..100) {
            0..70 => Operation::Allow,
            70..85 => Operation::Remaining,
            85..95 => Operation::RetryAfter,
            _ => Operation::Limit,
        }
    }
}

/// Counters collected by the workers
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StressReport {
    pub operations: u64,
    pub allow_calls: u64,
    pub allowed: u64,
    pub throttled: u64,
    pub orphan_keys: u64,
    pub elapsed: Duration,
}

impl StressReport {
    fn merge(&mut self, other: &StressReport) {
        self.operations += other.operations;
        self.allow_calls += other.allow_calls;
        self.allowed += other.allowed;
        self.throttled += other.throttled;
        self.orphan_keys += other.orphan_keys;
    }

    /// Operations per second over the whole run
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.operations as f64 / secs
    }
}

fn worker(limiter: &dyn KeyLimiter, worker_id: usize, config: &StressConfig) -> StressReport {
    let mut rng = rand::thread_rng();
    let mut report = StressReport::default();

    for i in 0..config.iterations {
        let key = if rng.gen_ratio(ORPHAN_KEY_PERCENT, 100) {
            report.orphan_keys += 1;
            format!("orphan_{worker_id}_{i}")
        } else {
            format!("key_{}", rng.gen_range(0..config.keys))
        };

        match Operation::pick(&mut rng) {
            Operation::Allow => {
                report.allow_calls += 1;
                if limiter.allow(&key) {
                    report.allowed += 1;
                } else {
                    report.throttled += 1;
                }
            }
            Operation::Remaining => {
                limiter.remaining(&key);
            }
            Operation::RetryAfter => {
                limiter.retry_after(&key);
            }
            Operation::Limit => {
                limiter.limit(&key);
            }
        }
        report.operations += 1;
    }

    report
}

/// Run the configured load and collect the totals
///
/// # Errors
///
/// Returns an error if a worker thread panics.
pub fn run(limiter: Arc<dyn KeyLimiter>, config: &StressConfig) -> Result<StressReport> {
    tracing::info!(
        threads = config.threads,
        iterations = config.iterations,
        keys = config.keys,
        "starting stress run"
    );

    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|worker_id| {
            let limiter = Arc::clone(&limiter);
            let config = config.clone();
            thread::spawn(move || worker(&*limiter, worker_id, &config))
        })
        .collect();

    let mut report = StressReport::default();
    for handle in handles {
        let partial = handle
            .join()
            .map_err(|_| anyhow!("Stress worker panicked"))?;
        report.merge(&partial);
    }
    report.elapsed = start.elapsed();

    tracing::info!(
        operations = report.operations,
        allowed = report.allowed,
        throttled = report.throttled,
        orphan_keys = report.orphan_keys,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "stress run finished"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use keylimiter::{ManualClock, TokenBucketLimiter};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_operation_mix() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut counts = [0u32; 4];

        for _ in 0..10_000 {
            let index = match Operation::pick(&mut rng) {
                Operation::Allow => 0,
                Operation::Remaining => 1,
                Operation::RetryAfter => 2,
                Operation::Limit => 3,
            };
            counts[index] += 1;
        }

        // Loose bounds around 70/15/10/5
        assert!((6_500..7_500).contains(&counts[0]), "{counts:?}");
        assert!((1_200..1_800).contains(&counts[1]), "{counts:?}");
        assert!((700..1_300).contains(&counts[2]), "{counts:?}");
        assert!((300..700).contains(&counts[3]), "{counts:?}");
    }

    #[test]
    fn test_stress_totals_add_up() {
        let limiter: Arc<dyn KeyLimiter> = Arc::new(TokenBucketLimiter::new(5, 1.0).unwrap());
        let config = StressConfig {
            threads: 4,
            iterations: 500,
            keys: 20,
        };

        let report = run(limiter, &config).unwrap();

        assert_eq!(report.operations, 2_000);
        assert_eq!(report.allowed + report.throttled, report.allow_calls);
        assert!(report.allow_calls <= report.operations);
    }

    #[test]
    fn test_frozen_clock_caps_admissions_per_pooled_key() {
        let limiter: Arc<dyn KeyLimiter> = Arc::new(
            TokenBucketLimiter::builder(3, 1.0)
                .clock(ManualClock::new())
                .build()
                .unwrap(),
        );
        let config = StressConfig {
            threads: 2,
            iterations: 1_000,
            keys: 4,
        };

        let report = run(limiter, &config).unwrap();

        // Pooled keys admit at most 3 each; every orphan key is fresh
        assert!(report.allowed <= 4 * 3 + report.orphan_keys);
    }
}
