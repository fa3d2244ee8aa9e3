use super::PlatformCounters;
use crate::system::source::{CpuCounters, IoCounters};

pub struct Platform;

impl PlatformCounters for Platform {
    // No portable tick source; the collector synthesizes ticks from sysinfo.
    fn cpu_ticks() -> Option<CpuCounters> {
        None
    }

    fn disk_io() -> Option<IoCounters> {
        None
    }

    fn process_ids() -> Option<Vec<u32>> {
        None
    }

    fn gpus() -> Vec<String> {
        Vec::new()
    }
}
