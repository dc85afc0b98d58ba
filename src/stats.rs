use crate::storage::PrimeCache;
use std::fmt;
use std::path::PathBuf;

const LARGEST_SHOWN: usize = 5;

/// Summary of a stored cache
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub path: PathBuf,
    pub file_size: u64,
    pub max_checked: u64,
    pub count: usize,
    /// Share of `[1, max_checked]` that is prime, in percent
    pub density_percent: f64,
    /// π(x) ≈ x / ln x, for comparison with `count`
    pub estimated_count: Option<f64>,
    /// Largest primes, descending
    pub largest: Vec<u64>,
}

impl CacheStats {
    pub fn from_cache(path: PathBuf, file_size: u64, cache: &PrimeCache) -> Self {
        let count = cache.primes.len();
        let max_checked = cache.max_checked;
        let density_percent = if max_checked > 1 {
            count as f64 / max_checked as f64 * 100.0
        } else {
            0.0
        };
        let estimated_count = (max_checked > 10).then(|| {
            let x = max_checked as f64;
            x / x.ln()
        });

        Self {
            path,
            file_size,
            max_checked,
            count,
            density_percent,
            estimated_count,
            largest: cache.primes.iter().rev().take(LARGEST_SHOWN).collect(),
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Store:        {}", self.path.display())?;
        writeln!(
            f,
            "File size:    {} bytes ({:.2} MB)",
            self.file_size,
            self.file_size as f64 / 1024.0 / 1024.0
        )?;
        writeln!(f, "Max checked:  {}", self.max_checked)?;
        writeln!(f, "Primes:       {}", self.count)?;
        if self.max_checked > 1 {
            writeln!(f, "Density:      {:.3}%", self.density_percent)?;
        }
        if let Some(estimate) = self.estimated_count {
            let diff = self.count as f64 - estimate;
            writeln!(
                f,
                "x/ln(x):      {:.0} (difference {:+.0}, {:+.1}%)",
                estimate,
                diff,
                diff / estimate * 100.0
            )?;
        }
        if !self.largest.is_empty() {
            let largest: Vec<String> = self.largest.iter().map(|p| p.to_string()).collect();
            writeln!(f, "Largest:      {}", largest.join(", "))?;
        }
        Ok(())
    }
}
