use crate::config::PlannerConfig;
use crate::error::{EngineError, EngineResult};
use crate::resources::Resources;
use std::fmt;
use tracing::debug;

/// Which sieve drives a generation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// Single pass, bit-packed odd-only sieve over the whole range
    Plain,
    /// Wheel-30 segments on one thread
    Segmented,
    /// Wheel-30 segments on a worker pool
    SegmentedParallel,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Plain => "plain",
            Self::Segmented => "segmented",
            Self::SegmentedParallel => "segmented-parallel",
        };
        write!(f, "{}", name)
    }
}

/// Execution plan for one generation request. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyPlan {
    pub algorithm: Algorithm,
    /// Numbers per segment; 0 for the plain sieve
    pub segment_size: u64,
    pub worker_count: usize,
}

impl StrategyPlan {
    pub fn plain() -> Self {
        Self {
            algorithm: Algorithm::Plain,
            segment_size: 0,
            worker_count: 1,
        }
    }

    /// Apply caller overrides. A worker override above one makes the plan
    /// parallel; a segment override turns a plain plan into a segmented one.
    pub fn with_overrides(
        mut self,
        worker_count: Option<usize>,
        segment_size: Option<u64>,
    ) -> Self {
        if let Some(size) = segment_size.filter(|&s| s > 0) {
            self.segment_size = size;
            if self.algorithm == Algorithm::Plain {
                self.algorithm = Algorithm::Segmented;
            }
        }
        if let Some(workers) = worker_count.filter(|&w| w > 0) {
            self.worker_count = workers;
            if workers > 1 {
                self.algorithm = Algorithm::SegmentedParallel;
            } else if self.algorithm == Algorithm::SegmentedParallel {
                self.algorithm = Algorithm::Segmented;
            }
        }
        if self.algorithm != Algorithm::Plain && self.segment_size == 0 {
            self.segment_size = DEFAULT_SEGMENT_SIZE;
        }
        self
    }

    /// One line description for logs and the CLI
    pub fn describe(&self) -> String {
        match self.algorithm {
            Algorithm::Plain => "plain sieve".to_string(),
            Algorithm::Segmented => format!("segmented sieve (segments: {})", self.segment_size),
            Algorithm::SegmentedParallel => format!(
                "parallel segmented sieve ({} workers, segments: {})",
                self.worker_count, self.segment_size
            ),
        }
    }

    /// Number of segments needed to cover `bound` numbers
    pub fn estimated_segments(&self, bound: u64) -> u64 {
        if self.segment_size == 0 {
            return 1;
        }
        bound.div_ceil(self.segment_size)
    }
}

/// Used when an override forces segmentation without giving a size
pub const DEFAULT_SEGMENT_SIZE: u64 = 1_000_000;

/// Choose an algorithm, segment size and worker count for `bound`
pub fn plan(bound: u64, resources: &Resources, cfg: &PlannerConfig) -> EngineResult<StrategyPlan> {
    if bound < 2 {
        return Err(EngineError::InvalidBound(bound));
    }

    let mem_gib = resources.memory_gib();
    let logical = resources.logical_cores.max(1);
    let physical = resources.physical_cores.max(1);

    let plan = if bound <= cfg.plain_max {
        StrategyPlan::plain()
    } else if bound <= cfg.segmented_max {
        StrategyPlan {
            algorithm: Algorithm::Segmented,
            segment_size: (bound / 10).min(cfg.segmented_segment_cap).max(1),
            worker_count: 1,
        }
    } else if bound <= cfg.parallel_max {
        let worker_count = if resources.hyperthreaded() {
            let share = logical * usize::from(cfg.hyperthread_share_percent) / 100;
            share.max(2)
        } else {
            physical.saturating_sub(1).max(2)
        };
        let segment_size = match mem_gib {
            m if m >= 16 => cfg.parallel_segments[0],
            m if m >= 8 => cfg.parallel_segments[1],
            _ => cfg.parallel_segments[2],
        };
        StrategyPlan {
            algorithm: Algorithm::SegmentedParallel,
            segment_size,
            worker_count,
        }
    } else {
        let worker_count = if logical >= 16 {
            logical.min(cfg.huge_worker_cap)
        } else if logical >= 8 {
            logical - 1
        } else {
            logical
        };
        let segment_size = match mem_gib {
            m if m >= 32 => cfg.huge_segments[0],
            m if m >= 16 => cfg.huge_segments[1],
            m if m >= 8 => cfg.huge_segments[2],
            _ => cfg.huge_segments[3],
        };
        StrategyPlan {
            algorithm: Algorithm::SegmentedParallel,
            segment_size,
            worker_count: worker_count.max(1),
        }
    };

    debug!("Planned {} for bound {}", plan.describe(), bound);
    Ok(plan)
}
