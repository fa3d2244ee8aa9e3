//! Turns raw cumulative readings into published snapshots.
//!
//! Rates come from differencing consecutive fresh counters. Subsystems that
//! fail on a tick keep their previous values and are flagged stale.

use std::time::Duration;

use super::process::ProcessInfo;
use super::snapshot::{Snapshot, Staleness};
use super::source::{CpuCounters, DiskReading, IoCounters, MemoryReading, ProcessReading, RawReading};
use crate::error::{Error, Result};

/// `(counter_t - counter_t-1) / (t - t-1)` in units per second.
///
/// A regressed counter or zero elapsed time reads as 0.
pub fn per_second(prev: Option<(u64, Duration)>, cur: (u64, Duration)) -> Result<f64> {
    let Some((prev_value, prev_at)) = prev else {
        return Err(Error::HistoryUnderflow { available: 1 });
    };
    let elapsed = cur.1.saturating_sub(prev_at).as_secs_f64();
    if elapsed <= 0.0 {
        return Ok(0.0);
    }
    Ok(cur.0.saturating_sub(prev_value) as f64 / elapsed)
}

#[derive(Debug, Default)]
pub struct Aggregator {
    seq: u64,
    /// Last published values without the process table.
    carry: Option<Snapshot>,
    prev_cpu: Option<CpuCounters>,
    prev_io: Option<(IoCounters, Duration)>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the next snapshot. `timestamp` is nudged forward if it does not
    /// advance past the previous snapshot.
    pub fn ingest(&mut self, timestamp: Duration, reading: Result<RawReading>) -> Snapshot {
        self.seq += 1;
        let timestamp = match &self.carry {
            Some(last) if timestamp <= last.timestamp => last.timestamp + Duration::from_nanos(1),
            _ => timestamp,
        };

        let mut snap = Snapshot {
            seq: self.seq,
            timestamp,
            stale: Staleness::default(),
            omitted_pids: Vec::new(),
            errors: Vec::new(),
            ..self.carry.clone().unwrap_or_default()
        };

        let mut processes = Vec::new();
        match reading {
            Ok(raw) => {
                match raw.cpu {
                    Ok(cpu) => self.apply_cpu(&mut snap, cpu),
                    Err(err) => Self::mark(&mut snap, err, |s| s.cpu = true),
                }
                match raw.memory {
                    Ok(memory) => Self::apply_memory(&mut snap, memory),
                    Err(err) => Self::mark(&mut snap, err, |s| {
                        s.memory = true;
                        s.swap = true;
                    }),
                }
                match raw.disk {
                    Ok(disk) => self.apply_disk(&mut snap, disk),
                    Err(err) => Self::mark(&mut snap, err, |s| s.disk = true),
                }
                match raw.processes {
                    Ok(reading) => processes = Self::apply_processes(&mut snap, reading),
                    Err(err) => Self::mark(&mut snap, err, |s| s.processes = true),
                }
            }
            Err(err) => {
                tracing::warn!(seq = snap.seq, error = %err, "metric source unavailable");
                snap.stale = Staleness::all();
                snap.errors.push(err);
            }
        }

        if snap.stale.any() {
            tracing::debug!(seq = snap.seq, stale = ?snap.stale, "degraded snapshot");
        }

        self.carry = Some(snap.clone());
        snap.processes = processes;
        snap
    }

    fn mark(snap: &mut Snapshot, err: Error, flag: impl FnOnce(&mut Staleness)) {
        tracing::warn!(seq = snap.seq, error = %err, "partial metric reading");
        flag(&mut snap.stale);
        snap.errors.push(err);
    }

    fn apply_cpu(&mut self, snap: &mut Snapshot, cpu: CpuCounters) {
        // The first reading has nothing to difference against.
        let prev = self.prev_cpu.as_ref();
        snap.cpu_total_pct = prev.map(|p| cpu.total.percent_since(p.total)).unwrap_or(0.0);
        snap.cpu_per_core = cpu
            .per_core
            .iter()
            .enumerate()
            .map(|(i, ticks)| {
                prev.and_then(|p| p.per_core.get(i))
                    .map(|p| ticks.percent_since(*p))
                    .unwrap_or(0.0)
            })
            .collect();
        self.prev_cpu = Some(cpu);
    }

    fn apply_memory(snap: &mut Snapshot, memory: MemoryReading) {
        snap.mem_used = memory.mem_used;
        snap.mem_total = memory.mem_total;
        snap.swap_used = memory.swap_used;
        snap.swap_total = memory.swap_total;
    }

    fn apply_disk(&mut self, snap: &mut Snapshot, disk: DiskReading) {
        snap.disk_used = disk.used;
        snap.disk_total = disk.total;
        let Some(io) = disk.io else {
            snap.disk_read_rate = 0.0;
            snap.disk_write_rate = 0.0;
            return;
        };
        let prev = self.prev_io;
        snap.disk_read_rate = per_second(
            prev.map(|(p, at)| (p.read_bytes, at)),
            (io.read_bytes, snap.timestamp),
        )
        .unwrap_or_default();
        snap.disk_write_rate = per_second(
            prev.map(|(p, at)| (p.written_bytes, at)),
            (io.written_bytes, snap.timestamp),
        )
        .unwrap_or_default();
        self.prev_io = Some((io, snap.timestamp));
    }

    fn apply_processes(snap: &mut Snapshot, reading: ProcessReading) -> Vec<ProcessInfo> {
        if !reading.omitted.is_empty() {
            tracing::debug!(
                seq = snap.seq,
                omitted = reading.omitted.len(),
                "processes skipped this tick"
            );
            snap.stale.processes = true;
            snap.omitted_pids = reading.omitted;
        }
        let mem_total = snap.mem_total;
        reading
            .processes
            .into_iter()
            .map(|p| ProcessInfo {
                pid: p.pid,
                mem_pct: if mem_total == 0 {
                    0.0
                } else {
                    (p.resident_bytes as f64 / mem_total as f64 * 100.0) as f32
                },
                cpu_pct: if p.cpu_pct.is_finite() {
                    p.cpu_pct.clamp(0.0, 100.0)
                } else {
                    0.0
                },
                user: p.user,
                command: p.command,
                name: p.name,
                virtual_bytes: p.virtual_bytes,
                resident_bytes: p.resident_bytes,
                start_time: p.start_time,
            })
            .collect()
    }
}
