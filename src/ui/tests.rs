use std::time::Duration;

use crate::error::{Error, Subsystem};
use crate::sampler::SamplerCounts;
use crate::system::host::HostInfo;
use crate::system::process::ProcessInfo;
use crate::system::snapshot::{Snapshot, Staleness};
use crate::theme::ResolvedTheme;

const GIB: u64 = 1024 * 1024 * 1024;

fn snapshot() -> Snapshot {
    Snapshot {
        seq: 7,
        cpu_total_pct: 62.5,
        cpu_per_core: vec![10.0, 90.0],
        mem_used: 4 * GIB,
        mem_total: 16 * GIB,
        swap_used: 0,
        swap_total: 2 * GIB,
        disk_used: 100 * GIB,
        disk_total: 125 * GIB,
        disk_read_rate: 2048.0,
        disk_write_rate: 0.0,
        ..Snapshot::default()
    }
}

#[test]
fn header_lists_host_facts() {
    let host = HostInfo {
        hostname: "box".into(),
        os_name: "Linux".into(),
        kernel: "6.1".into(),
        cpu_model: "Test CPU".into(),
        logical_cores: 8,
        gpus: vec![
            "VGA compatible controller: Intel Corporation [8086:46a6]".into(),
            "3D controller: NVIDIA Corporation [10de:25a2]".into(),
        ],
        boot_time: 0,
    };
    let lines = super::header::render(&host, Duration::from_secs(90_061), ResolvedTheme::Light);
    assert_eq!(
        lines,
        vec![
            "Host: box",
            "Uptime: 1 day 1:01:01",
            "OS: Linux (kernel 6.1)",
            "CPU: Test CPU (8 logical)",
            "GPU1: VGA compatible controller: Intel Corporation [8086:46a6]",
            "GPU2: 3D controller: NVIDIA Corporation [10de:25a2]",
            "Theme: light",
        ]
    );

    let headless = HostInfo {
        gpus: Vec::new(),
        ..host
    };
    let lines = super::header::render(&headless, Duration::from_secs(5), ResolvedTheme::Dark);
    assert_eq!(lines[4], "GPU: (none detected)");
    assert_eq!(lines.len(), 6);
}

#[test]
fn gauges_mark_load_and_rates() {
    let lines = super::gauges::render(&snapshot());
    assert_eq!(
        lines,
        vec![
            "CPU   62.5%!",
            "      cpu0=10% cpu1=90%",
            "RAM   4.0 GB / 16.0 GB (25.0%)",
            "SWAP  0 B / 2.0 GB (0.0%)",
            "Disk  100.0 GB / 125.0 GB (80.0%)!!  read 2 KB/s write 0 B/s",
        ]
    );
}

#[test]
fn gauges_flag_stale_fields() {
    let snap = Snapshot {
        stale: Staleness {
            cpu: true,
            swap: true,
            ..Staleness::default()
        },
        ..snapshot()
    };
    let lines = super::gauges::render(&snap);
    assert_eq!(lines[0], "CPU   62.5%! (stale)");
    assert!(lines[3].ends_with("(0.0%) (stale)"));
    assert!(!lines[2].contains("stale"));
}

#[test]
fn table_aligns_columns() {
    let rows = vec![ProcessInfo {
        pid: 42,
        user: "averyveryverylongname".into(),
        cpu_pct: 12.34,
        mem_pct: 1.0,
        command: "/usr/bin/worker --fast".into(),
        name: "worker".into(),
        virtual_bytes: 2048,
        resident_bytes: 512,
        start_time: 1_000,
    }];
    let lines = super::table::render(&rows, 1_061);
    assert_eq!(
        lines,
        vec![
            "    PID USER        %CPU  %MEM      VIRT       RES    ELAPSED CMD",
            "     42 averyvery\u{2026}  12.3   1.0      2 KB     512 B    0:01:01 /usr/bin/worker --fast",
        ]
    );
}

#[test]
fn status_line_reports_drops_and_errors() {
    let mut snap = snapshot();
    snap.processes = vec![ProcessInfo::default(); 3];
    snap.omitted_pids = vec![99];
    snap.errors = vec![Error::unavailable(Subsystem::Disk, "gone")];
    let counts = SamplerCounts {
        polls: 10,
        dropped: 2,
        timed_out: 1,
        degraded: 1,
    };
    let line = super::statusbar::render(&snap, Duration::from_millis(1500), counts, Some(40.0));
    assert_eq!(
        line,
        format!(
            "#7 | Processes: 3 | Interval: 1.5s | CPU avg: 40.0% | dropped 2 / timed out 1 | 1 unreadable | {}",
            Error::unavailable(Subsystem::Disk, "gone")
        )
    );
}

#[test]
fn quiet_status_line() {
    let line = super::statusbar::render(
        &snapshot(),
        Duration::from_secs(1),
        SamplerCounts::default(),
        None,
    );
    assert_eq!(line, "#7 | Processes: 0 | Interval: 1.0s");
}
