//! primecache - incremental prime generation
//!
//! Keeps a persistent, verified record of every prime up to `max_checked`
//! and extends it on demand with a wheel-30 segmented sieve sized to the
//! host's cores and memory.

pub mod config;
pub mod engine;
pub mod error;
pub mod import;
pub mod parallel;
pub mod planner;
pub mod prime_set;
pub mod primes;
pub mod resources;
pub mod segment;
pub mod stats;
pub mod storage;
pub mod trial;
pub mod verify;
pub mod wheel;

pub use config::Config;
pub use engine::{CacheView, Engine, GenerateOptions, MergeOutcome, Method};
pub use error::{EngineError, EngineResult};
pub use prime_set::PrimeSet;
pub use storage::IncrementalCacheStore;
pub use verify::{VerifyOptions, VerifyReport};
