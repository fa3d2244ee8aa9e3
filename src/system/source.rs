//! The uniform polling interface over OS counters.
//!
//! A [`MetricSource`] returns raw, cumulative readings. Turning counters into
//! rates is the aggregator's job, which keeps sources free of timing state.

use serde::Serialize;

use crate::error::Result;

/// Cumulative CPU ticks: time spent busy and total elapsed, in clock ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CpuTicks {
    pub busy: u64,
    pub total: u64,
}

impl CpuTicks {
    /// Busy share of the ticks elapsed since `prev`, clamped to `[0, 100]`.
    ///
    /// A counter that went backwards (wraparound, hotplug reset) reads as 0.
    pub fn percent_since(self, prev: CpuTicks) -> f32 {
        let total = self.total.saturating_sub(prev.total);
        if total == 0 {
            return 0.0;
        }
        let busy = self.busy.saturating_sub(prev.busy);
        ((busy as f64 / total as f64) * 100.0).clamp(0.0, 100.0) as f32
    }

    /// Advance a synthetic counter by one period at the given utilisation.
    pub fn advance(&mut self, percent: f32) {
        const PERIOD: u64 = 1000;
        let pct = if percent.is_finite() {
            percent.clamp(0.0, 100.0)
        } else {
            0.0
        };
        self.busy += (f64::from(pct) * PERIOD as f64 / 100.0).round() as u64;
        self.total += PERIOD;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpuCounters {
    pub total: CpuTicks,
    pub per_core: Vec<CpuTicks>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryReading {
    pub mem_used: u64,
    pub mem_total: u64,
    pub swap_used: u64,
    pub swap_total: u64,
}

/// Cumulative block I/O since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IoCounters {
    pub read_bytes: u64,
    pub written_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiskReading {
    pub used: u64,
    pub total: u64,
    pub io: Option<IoCounters>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawProcess {
    pub pid: u32,
    pub name: String,
    pub user: String,
    pub command: String,
    /// Share of the whole machine, already normalized by core count.
    pub cpu_pct: f32,
    pub resident_bytes: u64,
    pub virtual_bytes: u64,
    pub start_time: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessReading {
    pub processes: Vec<RawProcess>,
    /// Processes listed by the OS whose details could not be read.
    pub omitted: Vec<u32>,
}

/// One poll of every subsystem. A failing subsystem carries its own error so
/// the rest of the reading stays usable.
#[derive(Debug, Clone)]
pub struct RawReading {
    pub cpu: Result<CpuCounters>,
    pub memory: Result<MemoryReading>,
    pub disk: Result<DiskReading>,
    pub processes: Result<ProcessReading>,
}

pub trait MetricSource: Send + 'static {
    /// Poll the OS once. Fails only when nothing at all could be read.
    fn read(&mut self) -> Result<RawReading>;
}

impl<S: MetricSource + ?Sized> MetricSource for Box<S> {
    fn read(&mut self) -> Result<RawReading> {
        (**self).read()
    }
}
