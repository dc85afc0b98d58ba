use std::thread;
use sysinfo::System;
use tracing::debug;

pub const DEFAULT_CORES: usize = 1;
pub const DEFAULT_MEMORY_BYTES: u64 = 4 * GIB;
pub const GIB: u64 = 1024 * 1024 * 1024;

/// Host characteristics the planner sizes its plan from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resources {
    pub logical_cores: usize,
    pub physical_cores: usize,
    pub available_memory_bytes: u64,
}

impl Resources {
    /// Build from raw readings, filling anything unknown with conservative
    /// defaults. Physical cores never exceed logical cores.
    pub fn from_readings(
        logical: Option<usize>,
        physical: Option<usize>,
        memory: Option<u64>,
    ) -> Self {
        let logical_cores = logical.filter(|&n| n > 0).unwrap_or(DEFAULT_CORES);
        let physical_cores = physical
            .filter(|&n| n > 0)
            .unwrap_or(logical_cores)
            .min(logical_cores);
        let available_memory_bytes = memory.filter(|&m| m > 0).unwrap_or(DEFAULT_MEMORY_BYTES);

        Self {
            logical_cores,
            physical_cores,
            available_memory_bytes,
        }
    }

    /// Available memory in whole GiB, rounded down
    pub fn memory_gib(&self) -> u64 {
        self.available_memory_bytes / GIB
    }

    pub fn hyperthreaded(&self) -> bool {
        self.logical_cores > self.physical_cores
    }
}

impl Default for Resources {
    fn default() -> Self {
        Self::from_readings(None, None, None)
    }
}

/// Read CPU and memory characteristics of this host. Never fails.
pub fn probe() -> Resources {
    let logical = thread::available_parallelism().map(|n| n.get()).ok();

    let mut sys = System::new();
    sys.refresh_memory();
    let physical = sys.physical_core_count();
    let memory = Some(sys.available_memory());

    let resources = Resources::from_readings(logical, physical, memory);
    debug!(
        "Probed {} logical / {} physical cores, {} GiB available",
        resources.logical_cores,
        resources.physical_cores,
        resources.memory_gib()
    );
    resources
}
