use std::time::Duration;

use serde::Serialize;

use super::process::ProcessInfo;
use crate::error::Error;

/// Which fields of a snapshot carry prior values instead of a fresh reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Staleness {
    pub cpu: bool,
    pub memory: bool,
    pub swap: bool,
    pub disk: bool,
    /// Set when the process table is missing entries or could not be read.
    pub processes: bool,
}

impl Staleness {
    pub fn all() -> Self {
        Self {
            cpu: true,
            memory: true,
            swap: true,
            disk: true,
            processes: true,
        }
    }

    pub fn any(&self) -> bool {
        self.cpu || self.memory || self.swap || self.disk || self.processes
    }
}

/// One immutable reading of every tracked metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub seq: u64,
    /// Monotonic offset from when sampling started.
    pub timestamp: Duration,
    pub cpu_total_pct: f32,
    pub cpu_per_core: Vec<f32>,
    pub mem_used: u64,
    pub mem_total: u64,
    pub swap_used: u64,
    pub swap_total: u64,
    pub disk_used: u64,
    pub disk_total: u64,
    /// Bytes per second.
    pub disk_read_rate: f64,
    pub disk_write_rate: f64,
    pub processes: Vec<ProcessInfo>,
    pub stale: Staleness,
    pub omitted_pids: Vec<u32>,
    pub errors: Vec<Error>,
}

fn percent(used: u64, total: u64) -> f32 {
    if total == 0 {
        0.0
    } else {
        (used as f64 / total as f64 * 100.0) as f32
    }
}

impl Snapshot {
    pub fn mem_pct(&self) -> f32 {
        percent(self.mem_used, self.mem_total)
    }

    pub fn swap_pct(&self) -> f32 {
        percent(self.swap_used, self.swap_total)
    }

    pub fn disk_pct(&self) -> f32 {
        percent(self.disk_used, self.disk_total)
    }

    pub fn is_degraded(&self) -> bool {
        self.stale.any()
    }
}
