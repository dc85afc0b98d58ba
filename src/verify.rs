//! Audit of a stored cache: structure, primality of every stored value, and
//! completeness against a reference sieve.

use crate::prime_set::PrimeSet;
use crate::primes::sieve_up_to;
use crate::storage::StoredRecord;
use crate::trial;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyOptions {
    /// Only audit values up to this limit
    pub limit: Option<u64>,
    pub check_primality: bool,
    pub check_completeness: bool,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            limit: None,
            check_primality: true,
            check_completeness: true,
        }
    }
}

impl VerifyOptions {
    pub fn structure_only() -> Self {
        Self {
            limit: None,
            check_primality: false,
            check_completeness: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub store_found: bool,
    pub is_structurally_valid: bool,
    pub structural_problems: Vec<String>,
    pub warnings: Vec<String>,
    /// How many stored values went through trial division
    pub checked_primes: usize,
    pub primes_failing_primality: Vec<u64>,
    /// Primes the reference sieve found that the cache lacks
    pub missing_in_range: Vec<u64>,
    /// Stored values within the checked range that the reference sieve rejects
    pub superfluous: Vec<u64>,
    /// Upper end of the completeness check, 0 when skipped
    pub checked_up_to: u64,
}

impl VerifyReport {
    pub fn not_found() -> Self {
        Self {
            structural_problems: vec!["store not found".to_string()],
            ..Self::default()
        }
    }

    pub fn unreadable(reason: impl Into<String>) -> Self {
        Self {
            store_found: true,
            structural_problems: vec![format!("store unreadable: {}", reason.into())],
            ..Self::default()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.is_structurally_valid
            && self.primes_failing_primality.is_empty()
            && self.missing_in_range.is_empty()
            && self.superfluous.is_empty()
    }
}

/// Audit a decoded record
pub fn verify_record(record: &StoredRecord, opts: &VerifyOptions) -> VerifyReport {
    let structural_problems = record.problems();
    let mut warnings = Vec::new();

    if let Some(&max) = record.primes.iter().max() {
        // 10% tolerance
        if max <= record.max_checked && (max as f64) < record.max_checked as f64 * 0.9 {
            warnings.push(format!(
                "largest prime ({}) is well below max_checked ({})",
                max, record.max_checked
            ));
        }
    }

    let limit = opts.limit.unwrap_or(u64::MAX);
    let candidates: Vec<u64> = record.primes.iter().copied().filter(|&p| p <= limit).collect();

    let (checked_primes, primes_failing_primality) = if opts.check_primality {
        let mut failing: Vec<u64> = candidates
            .iter()
            .copied()
            .filter(|&p| !trial::is_prime(p))
            .collect();
        failing.sort_unstable();
        failing.dedup();
        (candidates.len(), failing)
    } else {
        (0, Vec::new())
    };

    let (checked_up_to, missing_in_range, superfluous) = if opts.check_completeness {
        let effective = record.max_checked.min(limit);
        let reference = PrimeSet::from_sorted(sieve_up_to(effective));
        let stored: PrimeSet = candidates.iter().copied().filter(|&p| p <= effective).collect();
        (
            effective,
            reference.difference(&stored),
            stored.difference(&reference),
        )
    } else {
        (0, Vec::new(), Vec::new())
    };

    VerifyReport {
        store_found: true,
        is_structurally_valid: structural_problems.is_empty(),
        structural_problems,
        warnings,
        checked_primes,
        primes_failing_primality,
        missing_in_range,
        superfluous,
        checked_up_to,
    }
}
