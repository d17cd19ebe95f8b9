use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use algpool_core::types::AcquireResult;
use algpool_core::AlgResourcePool;
use anyhow::Result;
use serde::Serialize;

const MAX_BACKOFF: Duration = Duration::from_millis(2);

#[derive(Default)]
struct Counters {
    executions: AtomicU64,
    failures: AtomicU64,
    retries: AtomicU64,
}

#[derive(Debug, Serialize)]
pub struct RunStats {
    pub events: usize,
    pub workers: usize,
    pub executions: u64,
    pub failed_executions: u64,
    pub busy_retries: u64,
    pub elapsed_ms: u128,
    pub events_per_sec: f64,
}

/// Drives `events` events through the pool on `workers` blocking tasks.
///
/// Each event executes every flat leaf once, in list order. Acquisition is
/// non-blocking: a busy unit is retried with a capped exponential backoff.
pub async fn run(pool: Arc<AlgResourcePool>, events: usize, workers: usize) -> Result<RunStats> {
    let leaves: Arc<Vec<String>> = Arc::new(
        pool.flat_algorithm_list()
            .iter()
            .map(|u| u.name().to_string())
            .collect(),
    );
    let next_event = Arc::new(AtomicUsize::new(0));
    let counters = Arc::new(Counters::default());
    let started = Instant::now();

    let mut handles = Vec::with_capacity(workers);
    for worker in 0..workers {
        let (pool, leaves, next_event, counters) = (
            Arc::clone(&pool),
            Arc::clone(&leaves),
            Arc::clone(&next_event),
            Arc::clone(&counters),
        );
        handles.push(tokio::task::spawn_blocking(move || -> Result<()> {
            loop {
                let event = next_event.fetch_add(1, Ordering::SeqCst);
                if event >= events {
                    return Ok(());
                }
                for name in leaves.iter() {
                    process(&pool, name, &counters)?;
                }
                tracing::trace!(worker, event, "Event done");
            }
        }));
    }

    for handle in handles {
        handle.await??;
    }

    let elapsed = started.elapsed();
    Ok(RunStats {
        events,
        workers,
        executions: counters.executions.load(Ordering::SeqCst),
        failed_executions: counters.failures.load(Ordering::SeqCst),
        busy_retries: counters.retries.load(Ordering::SeqCst),
        elapsed_ms: elapsed.as_millis(),
        events_per_sec: events as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
    })
}

fn process(pool: &AlgResourcePool, name: &str, counters: &Counters) -> Result<()> {
    let mut backoff = Duration::from_micros(10);
    loop {
        match pool.acquire_algorithm(name, false)? {
            AcquireResult::Success { instance } => {
                if let Err(e) = instance.execute() {
                    tracing::warn!(unit = name, error = %e, "Execution failed");
                    counters.failures.fetch_add(1, Ordering::Relaxed);
                }
                counters.executions.fetch_add(1, Ordering::Relaxed);
                pool.release_algorithm(name, instance)?;
                return Ok(());
            }
            AcquireResult::Failure { reason } => {
                tracing::trace!(unit = name, ?reason, "Retrying");
                counters.retries.fetch_add(1, Ordering::Relaxed);
                std::thread::sleep(backoff);
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
        }
    }
}
