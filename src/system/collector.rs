use std::collections::HashSet;
use std::path::Path;

use sysinfo::{Disks, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind, Users};

use super::host::HostInfo;
use super::platform;
use super::source::{
    CpuCounters, CpuTicks, DiskReading, MetricSource, MemoryReading, ProcessReading, RawProcess,
    RawReading,
};
use crate::error::{Error, Result, Subsystem};
use crate::format::truncate_unicode;

const COMMAND_WIDTH: usize = 100;

/// [`MetricSource`] backed by `sysinfo`, with raw tick and block I/O
/// counters from the platform layer where available.
pub struct SysinfoSource {
    sys: System,
    disks: Disks,
    users: Users,
    host: HostInfo,
    /// Accumulated ticks for platforms without a raw tick source.
    synthetic: Option<CpuCounters>,
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoSource {
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_cpu_all();
        sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::everything(),
        );
        let host = HostInfo::gather(&sys);
        SysinfoSource {
            sys,
            disks: Disks::new_with_refreshed_list(),
            users: Users::new_with_refreshed_list(),
            host,
            synthetic: None,
        }
    }

    pub fn host_info(&self) -> &HostInfo {
        &self.host
    }

    fn read_cpu(&mut self) -> Result<CpuCounters> {
        self.sys.refresh_cpu_all();
        if let Some(counters) = platform::cpu_ticks() {
            return Ok(counters);
        }

        let cpus = self.sys.cpus();
        if cpus.is_empty() {
            return Err(Error::unavailable(Subsystem::Cpu, "no CPUs reported"));
        }
        let acc = self.synthetic.get_or_insert_with(|| CpuCounters {
            total: CpuTicks::default(),
            per_core: vec![CpuTicks::default(); cpus.len()],
        });
        acc.per_core.resize(cpus.len(), CpuTicks::default());
        acc.total.advance(self.sys.global_cpu_usage());
        for (ticks, cpu) in acc.per_core.iter_mut().zip(cpus) {
            ticks.advance(cpu.cpu_usage());
        }
        Ok(acc.clone())
    }

    fn read_memory(&mut self) -> Result<MemoryReading> {
        self.sys.refresh_memory();
        let mem_total = self.sys.total_memory();
        if mem_total == 0 {
            return Err(Error::unavailable(Subsystem::Memory, "total memory reported as 0"));
        }
        Ok(MemoryReading {
            mem_used: self.sys.used_memory(),
            mem_total,
            swap_used: self.sys.used_swap(),
            swap_total: self.sys.total_swap(),
        })
    }

    fn read_disk(&mut self) -> Result<DiskReading> {
        self.disks.refresh(true);
        let root = self
            .disks
            .list()
            .iter()
            .find(|d| d.mount_point() == Path::new("/"))
            .or_else(|| self.disks.list().iter().max_by_key(|d| d.total_space()))
            .ok_or_else(|| Error::unavailable(Subsystem::Disk, "no mounted disks"))?;
        let total = root.total_space();
        Ok(DiskReading {
            used: total.saturating_sub(root.available_space()),
            total,
            io: platform::disk_io(),
        })
    }

    fn read_processes(&mut self) -> Result<ProcessReading> {
        // Listed before the refresh, so a process started in between is not
        // mistaken for an unreadable one.
        let listed = platform::process_ids();
        let refreshed = self.sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing()
                .with_memory()
                .with_cpu()
                .with_user(UpdateKind::OnlyIfNotSet)
                .with_cmd(UpdateKind::OnlyIfNotSet),
        );
        if refreshed == 0 || self.sys.processes().is_empty() {
            return Err(Error::unavailable(
                Subsystem::Processes,
                "process table not accessible",
            ));
        }

        // sysinfo reports per-process CPU relative to one core.
        let cores = self.sys.cpus().len().max(1) as f32;
        let mut reading = ProcessReading::default();
        for (pid, process) in self.sys.processes() {
            let name = process.name().to_string_lossy().to_string();
            if name.is_empty() {
                reading.omitted.push(pid.as_u32());
                continue;
            }
            let args: Vec<String> = process
                .cmd()
                .iter()
                .map(|s| s.to_string_lossy().to_string())
                .collect();
            let command = if args.is_empty() {
                name.clone()
            } else {
                args.join(" ")
            };
            let user = process
                .user_id()
                .and_then(|uid| self.users.get_user_by_id(uid))
                .map(|u| u.name().to_string())
                .unwrap_or_default();

            reading.processes.push(RawProcess {
                pid: pid.as_u32(),
                name,
                user,
                command: truncate_unicode(&command, COMMAND_WIDTH),
                cpu_pct: process.cpu_usage() / cores,
                resident_bytes: process.memory(),
                virtual_bytes: process.virtual_memory(),
                start_time: process.start_time(),
            });
        }
        if let Some(listed) = listed {
            let seen: HashSet<u32> = self.sys.processes().keys().map(|pid| pid.as_u32()).collect();
            reading.omitted.extend(unreported_pids(&listed, &seen));
        }
        reading.omitted.sort_unstable();
        reading.omitted.dedup();
        Ok(reading)
    }
}

/// Pids the kernel listed that the process table never reported: the process
/// exited mid-read or its stat could not be read.
fn unreported_pids(listed: &[u32], seen: &HashSet<u32>) -> Vec<u32> {
    listed.iter().copied().filter(|pid| !seen.contains(pid)).collect()
}

impl MetricSource for SysinfoSource {
    fn read(&mut self) -> Result<RawReading> {
        let _span = tracing::debug_span!("collector.read").entered();

        let reading = RawReading {
            cpu: self.read_cpu(),
            memory: self.read_memory(),
            disk: self.read_disk(),
            processes: self.read_processes(),
        };
        if reading.cpu.is_err()
            && reading.memory.is_err()
            && reading.disk.is_err()
            && reading.processes.is_err()
        {
            return Err(Error::unavailable(Subsystem::All, "no OS counters readable"));
        }
        Ok(reading)
    }
}
