//! Error types for primecache
//!
//! Engine operations return `EngineResult<T>`. Store decoding has its own
//! `StoreError` because a bad record is recovered as an empty cache rather
//! than surfaced to the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// All errors that can occur while generating or maintaining the cache
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid bound {0}: the planner needs a bound of at least 2")]
    InvalidBound(u64),

    #[error("Corrupt prime store at {path}: {reason}")]
    CorruptStore { path: PathBuf, reason: String },

    #[error("Sieve worker {worker} failed: {reason}")]
    WorkerFailure { worker: usize, reason: String },

    #[error("Generation cancelled before all segments completed")]
    Cancelled,

    #[error("Invalid import: {0}")]
    InvalidImport(String),

    #[error("Invalid configuration at {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl EngineError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Check if retrying the same call can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Cancelled | Self::WorkerFailure { .. } | Self::Io { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidBound(_) => Some("Pass a bound of 2 or more"),
            Self::CorruptStore { .. } => Some("Run: primecache generate <bound> --force-rebuild"),
            Self::Config { .. } => Some("Fix or remove the config file to use defaults"),
            _ => None,
        }
    }
}

/// Failures while decoding a persisted record
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("not a prime cache file (bad magic)")]
    BadMagic,

    #[error("unsupported store version {0}")]
    UnsupportedVersion(u32),

    #[error("record truncated: expected {expected} bytes, found {found}")]
    Truncated { expected: u64, found: u64 },

    #[error("checksum mismatch")]
    ChecksumMismatch,

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Attach the store path, producing the engine-level corruption error
    pub fn into_corrupt(self, path: impl Into<PathBuf>) -> EngineError {
        EngineError::CorruptStore {
            path: path.into(),
            reason: self.to_string(),
        }
    }
}
