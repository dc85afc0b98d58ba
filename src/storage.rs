//! On-disk prime cache.
//!
//! One file holds the whole record, little-endian:
//!
//! ```text
//! magic "PRMCACHE" (8) | version u32 | max_checked u64 | count u64
//! | count x u64 primes, ascending | sha256 of everything before it (32)
//! ```
//!
//! Writes go to a temp file in the same directory and are renamed over the
//! old record, so readers see either the old record or the new one.

use crate::error::{EngineError, EngineResult, StoreError};
use crate::prime_set::{PrimeSet, is_strictly_ascending};
use chrono::Local;
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

pub const MAGIC: &[u8; 8] = b"PRMCACHE";
pub const VERSION: u32 = 1;
const HEADER_LEN: usize = 8 + 4 + 8 + 8;
const CHECKSUM_LEN: usize = 32;

pub const STORE_FILE_NAME: &str = "primes.bin";
pub const EXECUTION_LOG_FILE_NAME: &str = "execution_log.txt";

/// The persisted record, validated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimeCache {
    pub primes: PrimeSet,
    /// Every integer in `[2, max_checked]` is in `primes` iff it is prime
    pub max_checked: u64,
}

impl PrimeCache {
    pub fn is_empty(&self) -> bool {
        self.primes.is_empty() && self.max_checked == 0
    }
}

/// A decoded record before any invariant checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub primes: Vec<u64>,
    pub max_checked: u64,
}

impl StoredRecord {
    /// Invariant violations, empty when the record is consistent
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if !is_strictly_ascending(&self.primes) {
            problems.push("primes are not stored in strictly ascending order".to_string());
        }
        let below_two = self.primes.iter().filter(|&&p| p < 2).count();
        if below_two > 0 {
            problems.push(format!("{} stored values are below 2", below_two));
        }
        if let Some(&max) = self.primes.iter().max() {
            if max > self.max_checked {
                problems.push(format!(
                    "largest prime ({}) exceeds max_checked ({})",
                    max, self.max_checked
                ));
            }
        }
        problems
    }

    pub fn into_cache(self) -> Result<PrimeCache, String> {
        let problems = self.problems();
        if !problems.is_empty() {
            return Err(problems.join("; "));
        }
        Ok(PrimeCache {
            primes: PrimeSet::from_sorted(self.primes),
            max_checked: self.max_checked,
        })
    }
}

/// Writes through to `inner` while hashing every byte
struct HashingWriter<W: Write> {
    inner: W,
    hasher: Sha256,
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Serialize a record into `writer`
pub fn encode_into<W: Write>(writer: W, primes: &[u64], max_checked: u64) -> io::Result<W> {
    let mut w = HashingWriter {
        inner: writer,
        hasher: Sha256::new(),
    };
    w.write_all(MAGIC)?;
    w.write_all(&VERSION.to_le_bytes())?;
    w.write_all(&max_checked.to_le_bytes())?;
    w.write_all(&(primes.len() as u64).to_le_bytes())?;
    for &p in primes {
        w.write_all(&p.to_le_bytes())?;
    }

    let digest = w.hasher.finalize();
    let mut inner = w.inner;
    inner.write_all(&digest)?;
    inner.flush()?;
    Ok(inner)
}

pub fn encode(primes: &[u64], max_checked: u64) -> Vec<u8> {
    let capacity = HEADER_LEN + primes.len() * 8 + CHECKSUM_LEN;
    // Writing into a Vec cannot fail
    encode_into(Vec::with_capacity(capacity), primes, max_checked).unwrap_or_default()
}

fn read_u64(bytes: &[u8], at: usize) -> u64 {
    let mut buf = [0_u8; 8];
    buf.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(buf)
}

/// Parse a record; checks framing and checksum only
pub fn decode(bytes: &[u8]) -> Result<StoredRecord, StoreError> {
    if bytes.len() < HEADER_LEN + CHECKSUM_LEN {
        return Err(StoreError::Truncated {
            expected: (HEADER_LEN + CHECKSUM_LEN) as u64,
            found: bytes.len() as u64,
        });
    }
    if &bytes[..8] != MAGIC {
        return Err(StoreError::BadMagic);
    }
    let version = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
    if version != VERSION {
        return Err(StoreError::UnsupportedVersion(version));
    }

    let max_checked = read_u64(bytes, 12);
    let count = read_u64(bytes, 20);
    let expected = count
        .checked_mul(8)
        .and_then(|n| n.checked_add((HEADER_LEN + CHECKSUM_LEN) as u64))
        .unwrap_or(u64::MAX);
    if expected != bytes.len() as u64 {
        return Err(StoreError::Truncated {
            expected,
            found: bytes.len() as u64,
        });
    }

    let body_end = bytes.len() - CHECKSUM_LEN;
    let digest = Sha256::digest(&bytes[..body_end]);
    if digest.as_slice() != &bytes[body_end..] {
        return Err(StoreError::ChecksumMismatch);
    }

    let primes = bytes[HEADER_LEN..body_end]
        .chunks_exact(8)
        .map(|chunk| read_u64(chunk, 0))
        .collect();

    Ok(StoredRecord { primes, max_checked })
}

/// Persistent prime cache with extend-in-place semantics.
///
/// `load` and `save` are the only ways the record changes.
#[derive(Debug, Clone)]
pub struct IncrementalCacheStore {
    path: PathBuf,
}

impl IncrementalCacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `primes.bin` under the user data directory
    pub fn default_location() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("primecache")
            .join(STORE_FILE_NAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn file_size(&self) -> Option<u64> {
        fs::metadata(&self.path).ok().map(|m| m.len())
    }

    /// Load the record. Absent, unreadable or inconsistent records all yield
    /// the empty cache; corruption is logged, never returned.
    pub fn load(&self) -> PrimeCache {
        let record = match self.load_checked() {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!("No prime cache at {}, starting empty", self.path.display());
                return PrimeCache::default();
            }
            Err(e) => {
                warn!("{}; starting from an empty cache", e.into_corrupt(&self.path));
                return PrimeCache::default();
            }
        };

        match record.into_cache() {
            Ok(cache) => {
                debug!(
                    "Loaded {} primes (max_checked {}) from {}",
                    cache.primes.len(),
                    cache.max_checked,
                    self.path.display()
                );
                cache
            }
            Err(reason) => {
                let err = EngineError::CorruptStore {
                    path: self.path.clone(),
                    reason,
                };
                warn!("{}; starting from an empty cache", err);
                PrimeCache::default()
            }
        }
    }

    /// Decode the raw record without invariant checks. `Ok(None)` when no
    /// record exists.
    pub fn load_checked(&self) -> Result<Option<StoredRecord>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        decode(&bytes).map(Some)
    }

    /// Atomically replace the record
    pub fn save(&self, primes: &PrimeSet, max_checked: u64) -> EngineResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)
            .map_err(|e| {
                EngineError::io(format!("creating store directory {}", dir.display()), e)
            })?;

        let mut tmp = NamedTempFile::new_in(&dir)
            .map_err(|e| EngineError::io(format!("creating temp file in {}", dir.display()), e))?;

        let writer = BufWriter::with_capacity(256 * 1024, tmp.as_file_mut());
        encode_into(writer, primes.as_slice(), max_checked)
            .map_err(|e| EngineError::io("writing prime cache", e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| EngineError::io("syncing prime cache", e))?;

        tmp.persist(&self.path).map_err(|e| {
            EngineError::io(format!("replacing {}", self.path.display()), e.error)
        })?;

        debug!(
            "Saved {} primes (max_checked {}) to {}",
            primes.len(),
            max_checked,
            self.path.display()
        );
        Ok(())
    }

    /// `execution_log.txt` next to the store
    pub fn execution_log_path(&self) -> PathBuf {
        self.path
            .parent()
            .map(|p| p.join(EXECUTION_LOG_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(EXECUTION_LOG_FILE_NAME))
    }

    /// Append one timing line to the execution log
    pub fn log_execution(
        &self,
        command: &str,
        bound: u64,
        algorithm: &str,
        duration_us: u128,
    ) -> io::Result<()> {
        let log_path = self.execution_log_path();
        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(log_path)?;

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");

        writeln!(
            file,
            "{} | {} | {} | {} | {}us",
            timestamp, command, bound, algorithm, duration_us
        )
    }
}
