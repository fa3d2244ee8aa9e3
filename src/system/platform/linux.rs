use std::path::Path;

use super::PlatformCounters;
use crate::system::source::{CpuCounters, CpuTicks, IoCounters};

const SECTOR_BYTES: u64 = 512;

pub struct Platform;

impl PlatformCounters for Platform {
    fn cpu_ticks() -> Option<CpuCounters> {
        let contents = std::fs::read_to_string("/proc/stat").ok()?;
        parse_proc_stat(&contents)
    }

    fn disk_io() -> Option<IoCounters> {
        let contents = std::fs::read_to_string("/proc/diskstats").ok()?;
        parse_diskstats(&contents, is_whole_disk)
    }

    fn process_ids() -> Option<Vec<u32>> {
        let entries = std::fs::read_dir("/proc").ok()?;
        let names: Vec<String> = entries
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        Some(parse_pid_entries(names.iter().map(String::as_str)))
    }

    fn gpus() -> Vec<String> {
        let Ok(entries) = std::fs::read_dir("/sys/bus/pci/devices") else {
            return Vec::new();
        };
        let mut devices: Vec<_> = entries.flatten().map(|e| e.path()).collect();
        devices.sort();
        let read = |dir: &Path, file: &str| {
            std::fs::read_to_string(dir.join(file))
                .map(|s| s.trim().to_string())
                .unwrap_or_default()
        };
        devices
            .iter()
            .filter_map(|dir| {
                describe_gpu(&read(dir, "class"), &read(dir, "vendor"), &read(dir, "device"))
            })
            .collect()
    }
}

/// Numeric directory names, ascending.
pub(crate) fn parse_pid_entries<'a>(names: impl Iterator<Item = &'a str>) -> Vec<u32> {
    let mut pids: Vec<u32> = names.filter_map(|name| name.parse().ok()).collect();
    pids.sort_unstable();
    pids
}

fn vendor_name(id: u16) -> Option<&'static str> {
    match id {
        0x10de => Some("NVIDIA Corporation"),
        0x1002 => Some("Advanced Micro Devices, Inc. [AMD/ATI]"),
        0x8086 => Some("Intel Corporation"),
        0x1af4 => Some("Red Hat, Inc."),
        0x15ad => Some("VMware"),
        0x1234 => Some("QEMU"),
        0x1a03 => Some("ASPEED Technology, Inc."),
        0x102b => Some("Matrox Electronics Systems Ltd."),
        _ => None,
    }
}

fn parse_hex(value: &str) -> Option<u32> {
    u32::from_str_radix(value.trim().trim_start_matches("0x"), 16).ok()
}

/// Only VGA-compatible (0x0300) and 3D (0x0302) controllers count.
pub(crate) fn describe_gpu(class: &str, vendor: &str, device: &str) -> Option<String> {
    let kind = match parse_hex(class)? >> 8 {
        0x0300 => "VGA compatible controller",
        0x0302 => "3D controller",
        _ => return None,
    };
    let vendor_id = parse_hex(vendor)? as u16;
    let device_id = parse_hex(device)? as u16;
    let ids = format!("[{vendor_id:04x}:{device_id:04x}]");
    Some(match vendor_name(vendor_id) {
        Some(name) => format!("{kind}: {name} {ids}"),
        None => format!("{kind}: {ids}"),
    })
}

/// Partitions have no entry of their own under /sys/block.
fn is_whole_disk(name: &str) -> bool {
    !name.starts_with("loop")
        && !name.starts_with("ram")
        && !name.starts_with("zram")
        && Path::new("/sys/block").join(name).exists()
}

fn parse_cpu_line(fields: &[&str]) -> Option<CpuTicks> {
    // user nice system idle iowait irq softirq steal (guest is already in user)
    let values: Vec<u64> = fields
        .iter()
        .take(8)
        .map(|f| f.parse().ok())
        .collect::<Option<_>>()?;
    if values.len() < 4 {
        return None;
    }
    let get = |i: usize| values.get(i).copied().unwrap_or(0);
    let idle = get(3) + get(4);
    let busy = get(0) + get(1) + get(2) + get(5) + get(6) + get(7);
    Some(CpuTicks {
        busy,
        total: busy + idle,
    })
}

pub(crate) fn parse_proc_stat(contents: &str) -> Option<CpuCounters> {
    let mut total = None;
    let mut per_core = Vec::new();
    for line in contents.lines() {
        let mut parts = line.split_whitespace();
        let Some(label) = parts.next() else {
            continue;
        };
        if !label.starts_with("cpu") {
            continue;
        }
        let fields: Vec<&str> = parts.collect();
        let ticks = parse_cpu_line(&fields)?;
        if label == "cpu" {
            total = Some(ticks);
        } else {
            per_core.push(ticks);
        }
    }
    Some(CpuCounters {
        total: total?,
        per_core,
    })
}

pub(crate) fn parse_diskstats(contents: &str, include: impl Fn(&str) -> bool) -> Option<IoCounters> {
    let mut counters = IoCounters::default();
    let mut seen = false;
    for line in contents.lines() {
        // major minor name reads merged sectors_read ms writes merged sectors_written ...
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 10 || !include(fields[2]) {
            continue;
        }
        let (Ok(read), Ok(written)) = (fields[5].parse::<u64>(), fields[9].parse::<u64>()) else {
            continue;
        };
        counters.read_bytes += read * SECTOR_BYTES;
        counters.written_bytes += written * SECTOR_BYTES;
        seen = true;
    }
    seen.then_some(counters)
}
