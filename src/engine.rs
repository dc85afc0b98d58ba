//! Generation entry points.
//!
//! The engine owns an `IncrementalCacheStore` and only ever grows the stored
//! record: a request that is already covered is answered from the cache, and
//! anything else sieves just the uncovered range `(max_checked, bound]`.

use crate::config::{Config, PlannerConfig};
use crate::error::{EngineError, EngineResult};
use crate::parallel::{SieveJob, sieve_range};
use crate::planner::{self, Algorithm, StrategyPlan};
use crate::prime_set::PrimeSet;
use crate::primes::{seed_limit, seed_primes, sieve_up_to};
use crate::resources::{self, Resources};
use crate::stats::CacheStats;
use crate::storage::{IncrementalCacheStore, PrimeCache};
use crate::trial;
use crate::verify::{VerifyOptions, VerifyReport, verify_record};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How an extension is computed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Method {
    /// Trial division for narrow extensions, the planned sieve otherwise
    #[default]
    Auto,
    Sieve,
    TrialDivision,
}

/// Caller overrides for one generation request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateOptions {
    pub worker_count: Option<usize>,
    pub segment_size: Option<u64>,
    /// Ignore the stored record and recompute from scratch
    pub force_rebuild: bool,
    pub method: Method,
}

/// What actually ran for an extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionMethod {
    Sieve(StrategyPlan),
    TrialDivision,
}

impl fmt::Display for ExtensionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sieve(plan) => write!(f, "{}", plan.algorithm),
            Self::TrialDivision => write!(f, "trial-division"),
        }
    }
}

/// Record of the computation behind a `CacheView`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub method: ExtensionMethod,
    /// Range that was computed, inclusive
    pub start: u64,
    pub end: u64,
    pub new_primes: usize,
    pub elapsed: Duration,
}

/// Primes up to a bound, as returned to callers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheView {
    pub primes: PrimeSet,
    pub max_checked: u64,
    /// `None` when the answer came straight from the stored record
    pub computed: Option<RunSummary>,
}

/// Outcome of `merge_external`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    pub added: usize,
    pub duplicates: usize,
    pub max_checked: u64,
    pub written: bool,
}

pub struct Engine {
    store: IncrementalCacheStore,
    planner: PlannerConfig,
    resources: Option<Resources>,
    execution_log: bool,
    cancel: Arc<AtomicBool>,
}

impl Engine {
    pub fn new(store: IncrementalCacheStore, config: &Config) -> Self {
        Self {
            store,
            planner: config.planner.clone(),
            resources: None,
            execution_log: config.store.execution_log,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Plan against fixed resources instead of probing the host
    pub fn with_resources(mut self, resources: Resources) -> Self {
        self.resources = Some(resources);
        self
    }

    pub fn store(&self) -> &IncrementalCacheStore {
        &self.store
    }

    /// Flag that aborts an in-progress sieve. It stays set until
    /// `clear_cancel` is called.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn clear_cancel(&self) {
        self.cancel.store(false, Ordering::Relaxed);
    }

    fn resources(&self) -> Resources {
        self.resources.unwrap_or_else(resources::probe)
    }

    /// Plan for `bound` on this host, with overrides applied
    pub fn plan(&self, bound: u64, opts: &GenerateOptions) -> EngineResult<StrategyPlan> {
        let plan = planner::plan(bound, &self.resources(), &self.planner)?;
        Ok(plan.with_overrides(opts.worker_count, opts.segment_size))
    }

    /// Every prime `<= bound`, extending the stored record when it does not
    /// reach `bound` yet. Either the new record is fully written or the old
    /// one is left untouched.
    pub fn ensure_primes_up_to(
        &self,
        bound: u64,
        opts: &GenerateOptions,
    ) -> EngineResult<CacheView> {
        if bound < 2 {
            return Ok(CacheView {
                max_checked: bound,
                ..CacheView::default()
            });
        }

        let started = Instant::now();
        let existing = if opts.force_rebuild {
            info!("Rebuilding prime cache from scratch");
            PrimeCache::default()
        } else {
            self.store.load()
        };

        if existing.max_checked >= bound {
            debug!(
                "Cache already covers {} (max_checked {}), nothing to compute",
                bound, existing.max_checked
            );
            let PrimeCache { mut primes, .. } = existing;
            primes.truncate_to(bound);
            return Ok(CacheView {
                primes,
                max_checked: bound,
                computed: None,
            });
        }

        let start = existing.max_checked + 1;
        let method = self.choose_method(&existing, bound, opts)?;
        info!("Extending cache over [{}, {}] using {}", start, bound, describe(&method));

        let new_primes = match method {
            ExtensionMethod::TrialDivision => {
                PrimeSet::from_sorted(trial::primes_in_range(start, bound))
            }
            ExtensionMethod::Sieve(plan) => self.sieve(&existing, start, bound, &plan)?,
        };
        let found = new_primes.len();

        let PrimeCache { mut primes, .. } = existing;
        primes.union_with(&new_primes);
        self.store.save(&primes, bound)?;

        let elapsed = started.elapsed();
        info!(
            "Found {} new primes in {:.2}ms; cache holds {} primes up to {}",
            found,
            elapsed.as_secs_f64() * 1000.0,
            primes.len(),
            bound
        );
        if self.execution_log {
            let algorithm = method.to_string();
            let micros = elapsed.as_micros();
            if let Err(e) = self.store.log_execution("generate", bound, &algorithm, micros) {
                warn!("Failed to log execution: {}", e);
            }
        }

        Ok(CacheView {
            primes,
            max_checked: bound,
            computed: Some(RunSummary {
                method,
                start,
                end: bound,
                new_primes: found,
                elapsed,
            }),
        })
    }

    fn choose_method(
        &self,
        existing: &PrimeCache,
        bound: u64,
        opts: &GenerateOptions,
    ) -> EngineResult<ExtensionMethod> {
        let narrow = !existing.primes.is_empty()
            && u128::from(existing.max_checked) * 100
                >= u128::from(bound) * u128::from(self.planner.trial_division_coverage_percent);

        match opts.method {
            Method::TrialDivision => Ok(ExtensionMethod::TrialDivision),
            Method::Auto if narrow => Ok(ExtensionMethod::TrialDivision),
            Method::Auto | Method::Sieve => Ok(ExtensionMethod::Sieve(self.plan(bound, opts)?)),
        }
    }

    fn sieve(
        &self,
        existing: &PrimeCache,
        start: u64,
        bound: u64,
        plan: &StrategyPlan,
    ) -> EngineResult<PrimeSet> {
        if plan.algorithm == Algorithm::Plain && start <= 2 {
            return Ok(PrimeSet::from_sorted(sieve_up_to(bound)));
        }

        let limit = seed_limit(bound, self.planner.seed_floor);
        let seeds = if existing.max_checked >= limit {
            debug!("Seeding from {} cached primes", existing.primes.count_up_to(limit));
            existing.primes.range(0..=limit).to_vec()
        } else {
            seed_primes(bound, self.planner.seed_floor)
        };

        // A plain extension is one segment on the calling thread
        let (segment_size, worker_count) = match plan.algorithm {
            Algorithm::Plain => (bound - start + 1, 1),
            _ => (plan.segment_size, plan.worker_count),
        };

        let job = SieveJob {
            segment_size,
            worker_count,
            seed_primes: &seeds,
            seed_limit: limit,
            cancel: Some(self.cancel.as_ref()),
        };
        sieve_range(start, bound, &job)
    }

    /// Audit the stored record
    pub fn verify_cache(&self, opts: &VerifyOptions) -> VerifyReport {
        match self.store.load_checked() {
            Ok(Some(record)) => verify_record(&record, opts),
            Ok(None) => VerifyReport::not_found(),
            Err(e) => VerifyReport::unreadable(e.to_string()),
        }
    }

    /// Merge a published prime list claimed to be complete over
    /// `[2, verified_up_to]`. Values above the current coverage are checked
    /// by trial division; completeness is taken on trust (see `verify_cache`).
    pub fn merge_external(
        &self,
        imported: &[u64],
        verified_up_to: u64,
    ) -> EngineResult<MergeOutcome> {
        if let Some(&bad) = imported.iter().find(|&&p| p < 2 || p > verified_up_to) {
            return Err(EngineError::InvalidImport(format!(
                "{} lies outside the claimed range [2, {}]",
                bad, verified_up_to
            )));
        }

        let existing = self.store.load();
        let imported = PrimeSet::from_unsorted(imported.to_vec());

        let covered = imported.range(0..=existing.max_checked);
        if let Some(&bad) = covered.iter().find(|&&p| !existing.primes.contains(p)) {
            return Err(EngineError::InvalidImport(format!(
                "{} is not prime (cache is complete up to {})",
                bad, existing.max_checked
            )));
        }
        let duplicates = covered.len();

        if verified_up_to <= existing.max_checked {
            return Ok(MergeOutcome {
                added: 0,
                duplicates,
                max_checked: existing.max_checked,
                written: false,
            });
        }

        let fresh = imported.range(existing.max_checked.saturating_add(1)..=verified_up_to);
        if let Some(&bad) = fresh.iter().find(|&&p| !trial::is_prime(p)) {
            return Err(EngineError::InvalidImport(format!("{} is not prime", bad)));
        }

        // Consecutive primes below 2^64 are never more than MAX_PRIME_GAP apart
        let last_known = existing.primes.max().unwrap_or(0);
        let mut previous = last_known;
        for &p in fresh.iter().chain(std::iter::once(&verified_up_to)) {
            if p - previous > MAX_PRIME_GAP {
                return Err(EngineError::InvalidImport(format!(
                    "no primes listed in ({}, {}), so the list is not complete up to {}",
                    previous, p, verified_up_to
                )));
            }
            previous = p;
        }
        if fresh.is_empty() {
            warn!(
                "Import adds no primes but raises coverage from {} to {}",
                existing.max_checked, verified_up_to
            );
        }
        let added = fresh.len();

        let PrimeCache { mut primes, .. } = existing;
        primes.extend_above(fresh);
        self.store.save(&primes, verified_up_to)?;
        info!("Merged {} imported primes; cache now complete up to {}", added, verified_up_to);

        Ok(MergeOutcome {
            added,
            duplicates,
            max_checked: verified_up_to,
            written: true,
        })
    }

    /// Statistics for the stored record, `None` when no record exists
    pub fn stats(&self) -> Option<CacheStats> {
        if !self.store.exists() {
            return None;
        }
        let cache = self.store.load();
        Some(CacheStats::from_cache(
            self.store.path().to_path_buf(),
            self.store.file_size().unwrap_or(0),
            &cache,
        ))
    }
}

/// Largest gap between consecutive primes below 2^64
const MAX_PRIME_GAP: u64 = 1_550;

fn describe(method: &ExtensionMethod) -> String {
    match method {
        ExtensionMethod::Sieve(plan) => plan.describe(),
        ExtensionMethod::TrialDivision => "trial division".to_string(),
    }
}
