use crate::error::{EngineError, EngineResult};
use crate::prime_set::PrimeSet;
use crate::segment::{Segment, SegmentSieve};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use tracing::debug;

/// Bounded pool of scoped worker threads.
///
/// Workers pull segment positions from an atomic counter, each with its own
/// reusable `SegmentSieve` buffer. Results are owned by the worker until the
/// join, then placed back in segment order.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    worker_count: usize,
}

impl WorkerPool {
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count: worker_count.max(1),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Run `work` over every segment and return the outputs in segment order.
    ///
    /// A panicking worker fails the whole run with `WorkerFailure`; a set
    /// `cancel` flag fails it with `Cancelled`. Either way no output escapes.
    pub fn run<F>(
        &self,
        segments: &[Segment],
        cancel: Option<&AtomicBool>,
        work: F,
    ) -> EngineResult<Vec<Vec<u64>>>
    where
        F: Fn(&mut SegmentSieve, &Segment) -> Vec<u64> + Sync,
    {
        let is_cancelled = || cancel.is_some_and(|flag| flag.load(Ordering::Relaxed));

        let workers = self.worker_count.min(segments.len());
        if workers <= 1 {
            let sequential = panic::catch_unwind(AssertUnwindSafe(|| {
                let mut sieve = SegmentSieve::new();
                let mut outputs = Vec::with_capacity(segments.len());
                for segment in segments {
                    if is_cancelled() {
                        return None;
                    }
                    outputs.push(work(&mut sieve, segment));
                }
                Some(outputs)
            }));
            return match sequential {
                Ok(Some(outputs)) => Ok(outputs),
                Ok(None) => Err(EngineError::Cancelled),
                Err(payload) => Err(EngineError::WorkerFailure {
                    worker: 0,
                    reason: panic_message(payload.as_ref()),
                }),
            };
        }

        let next_segment = AtomicUsize::new(0);
        let abort = AtomicBool::new(false);

        let joined: Vec<thread::Result<Option<Vec<(usize, Vec<u64>)>>>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(|| {
                        let mut sieve = SegmentSieve::new();
                        let mut owned = Vec::new();
                        loop {
                            if is_cancelled() || abort.load(Ordering::Relaxed) {
                                return None;
                            }
                            let position = next_segment.fetch_add(1, Ordering::Relaxed);
                            let Some(segment) = segments.get(position) else {
                                break;
                            };
                            owned.push((position, work(&mut sieve, segment)));
                        }
                        Some(owned)
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    let result = handle.join();
                    if !matches!(result, Ok(Some(_))) {
                        abort.store(true, Ordering::Relaxed);
                    }
                    result
                })
                .collect()
        });

        let mut outputs: Vec<Option<Vec<u64>>> = vec![None; segments.len()];
        let mut cancelled = false;
        for (worker, result) in joined.into_iter().enumerate() {
            match result {
                Ok(Some(owned)) => {
                    for (position, primes) in owned {
                        outputs[position] = Some(primes);
                    }
                }
                Ok(None) => cancelled = true,
                Err(payload) => {
                    return Err(EngineError::WorkerFailure {
                        worker,
                        reason: panic_message(payload.as_ref()),
                    });
                }
            }
        }
        if cancelled {
            return Err(EngineError::Cancelled);
        }

        outputs
            .into_iter()
            .enumerate()
            .map(|(position, output)| {
                output.ok_or_else(|| EngineError::WorkerFailure {
                    worker: usize::MAX,
                    reason: format!("segment {} produced no result", position),
                })
            })
            .collect()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "worker panicked".to_string()
    }
}

/// Inputs for sieving one range
#[derive(Debug, Clone, Copy)]
pub struct SieveJob<'a> {
    pub segment_size: u64,
    pub worker_count: usize,
    /// Every prime `<= seed_limit`, ascending
    pub seed_primes: &'a [u64],
    /// Must be at least `isqrt(end) + 1` for the range being sieved
    pub seed_limit: u64,
    pub cancel: Option<&'a AtomicBool>,
}

/// Primes in `[start, end]`.
///
/// Values up to `seed_limit` come straight from the seed set; the rest is cut
/// into segments of `segment_size` and sieved on the pool. Segment outputs
/// are disjoint and ascending, so the merge is an append in segment order.
pub fn sieve_range(start: u64, end: u64, job: &SieveJob<'_>) -> EngineResult<PrimeSet> {
    if start > end {
        return Ok(PrimeSet::new());
    }
    debug_assert!(job.seed_limit >= end.isqrt() || job.seed_limit >= end);

    let seeded_end = end.min(job.seed_limit);
    let mut merged = if start <= seeded_end {
        let lo = job.seed_primes.partition_point(|&p| p < start);
        let hi = job.seed_primes.partition_point(|&p| p <= seeded_end);
        PrimeSet::from_sorted(job.seed_primes[lo..hi].to_vec())
    } else {
        PrimeSet::new()
    };

    if end <= job.seed_limit {
        return Ok(merged);
    }

    let first_segment = start.max(job.seed_limit + 1);
    let segments = Segment::partition(first_segment, end, job.segment_size.max(1));
    let pool = WorkerPool::new(job.worker_count);
    debug!(
        "Sieving [{}, {}] in {} segments on {} workers",
        first_segment,
        end,
        segments.len(),
        pool.worker_count().min(segments.len())
    );

    let seeds = job.seed_primes;
    let outputs = pool.run(&segments, job.cancel, |sieve, segment| sieve.sieve(segment, seeds))?;
    for primes in &outputs {
        merged.extend_above(primes);
    }
    Ok(merged)
}
