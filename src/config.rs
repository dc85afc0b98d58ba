//! Configuration for primecache
//!
//! Stored at `~/.config/primecache/config.toml`. Every field has a default,
//! so a missing file or a partial file is always valid.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Strategy selection thresholds
    pub planner: PlannerConfig,

    /// Store location and logging
    pub store: StoreConfig,
}

/// Thresholds used by the strategy planner and the extension path.
///
/// These are empirically chosen; nothing in the sieve depends on them for
/// correctness, only for speed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Largest bound handled by the plain single-pass sieve
    pub plain_max: u64,

    /// Largest bound handled by the single-worker segmented sieve
    pub segmented_max: u64,

    /// Largest bound handled by the "large" parallel tier
    pub parallel_max: u64,

    /// Segment size cap for the single-worker segmented tier
    pub segmented_segment_cap: u64,

    /// Segment sizes for the large tier, indexed by memory (>=16, >=8, else)
    pub parallel_segments: [u64; 3],

    /// Segment sizes for the huge tier, indexed by memory (>=32, >=16, >=8, else)
    pub huge_segments: [u64; 4],

    /// Worker cap for the huge tier
    pub huge_worker_cap: usize,

    /// Share of logical cores used when hyperthreading is detected
    pub hyperthread_share_percent: u8,

    /// Existing coverage (percent of the new bound) above which a narrow
    /// extension is checked by trial division instead of sieved
    pub trial_division_coverage_percent: u8,

    /// Lowest value at which segmented sieving starts; everything below
    /// comes from the seed sieve
    pub seed_floor: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            plain_max: 1_000_000,
            segmented_max: 10_000_000,
            parallel_max: 100_000_000,
            segmented_segment_cap: 2_000_000,
            parallel_segments: [5_000_000, 2_000_000, 1_000_000],
            huge_segments: [20_000_000, 10_000_000, 5_000_000, 2_000_000],
            huge_worker_cap: 12,
            hyperthread_share_percent: 75,
            trial_division_coverage_percent: 70,
            seed_floor: 1_000,
        }
    }
}

/// Store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store file; defaults to the user data directory
    pub path: Option<PathBuf>,

    /// Append one line per generation to `execution_log.txt`
    pub execution_log: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            execution_log: true,
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("primecache")
            .join("config.toml")
    }

    /// Load configuration from `path`, or from the default path when `None`.
    /// A missing file yields defaults.
    pub fn load(path: Option<&Path>) -> EngineResult<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
        if !path.exists() {
            debug!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| EngineError::io(format!("reading config from {}", path.display()), e))?;
        Self::parse(&content).map_err(|reason| EngineError::Config { path, reason })
    }

    /// Parse TOML content
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }
}
