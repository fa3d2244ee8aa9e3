//! Raw cumulative counters that `sysinfo` does not expose.
//!
//! Every `target_os` switch in the crate lives under this module.

use super::source::{CpuCounters, IoCounters};

pub trait PlatformCounters {
    /// Cumulative busy/total CPU ticks, aggregate and per core.
    fn cpu_ticks() -> Option<CpuCounters>;
    /// Cumulative bytes read/written across whole block devices.
    fn disk_io() -> Option<IoCounters>;
    /// Every pid the kernel currently lists, when the platform can enumerate
    /// them independently of `sysinfo`.
    fn process_ids() -> Option<Vec<u32>>;
    /// Display and 3D controllers, one description per device.
    fn gpus() -> Vec<String>;
}

#[cfg(target_os = "linux")]
mod linux;
#[cfg(not(target_os = "linux"))]
mod fallback;

#[cfg(target_os = "linux")]
use linux as platform_impl;
#[cfg(not(target_os = "linux"))]
use fallback as platform_impl;

pub fn cpu_ticks() -> Option<CpuCounters> {
    platform_impl::Platform::cpu_ticks()
}

pub fn disk_io() -> Option<IoCounters> {
    platform_impl::Platform::disk_io()
}

pub fn process_ids() -> Option<Vec<u32>> {
    platform_impl::Platform::process_ids()
}

pub fn gpus() -> Vec<String> {
    platform_impl::Platform::gpus()
}
