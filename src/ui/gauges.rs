use crate::format::{format_bytes, format_rate};
use crate::system::snapshot::Snapshot;
use crate::theme::LoadLevel;

const CORES_PER_LINE: usize = 8;

fn stale_tag(stale: bool) -> &'static str {
    if stale { " (stale)" } else { "" }
}

fn usage(label: &str, used: u64, total: u64, pct: f32, stale: bool) -> String {
    format!(
        "{label:<5} {} / {} ({pct:.1}%){}{}",
        format_bytes(used),
        format_bytes(total),
        LoadLevel::classify(pct).marker().trim_end(),
        stale_tag(stale)
    )
}

/// CPU, per-core, memory, swap and disk lines for one snapshot.
pub fn render(snapshot: &Snapshot) -> Vec<String> {
    let stale = snapshot.stale;
    let mut lines = vec![format!(
        "CPU   {:.1}%{}{}",
        snapshot.cpu_total_pct,
        LoadLevel::classify(snapshot.cpu_total_pct).marker().trim_end(),
        stale_tag(stale.cpu)
    )];
    for (row, cores) in snapshot.cpu_per_core.chunks(CORES_PER_LINE).enumerate() {
        let cells: Vec<String> = cores
            .iter()
            .enumerate()
            .map(|(i, pct)| format!("cpu{}={pct:.0}%", row * CORES_PER_LINE + i))
            .collect();
        lines.push(format!("      {}", cells.join(" ")));
    }
    lines.push(usage(
        "RAM",
        snapshot.mem_used,
        snapshot.mem_total,
        snapshot.mem_pct(),
        stale.memory,
    ));
    lines.push(usage(
        "SWAP",
        snapshot.swap_used,
        snapshot.swap_total,
        snapshot.swap_pct(),
        stale.swap,
    ));
    lines.push(format!(
        "{}  read {} write {}",
        usage(
            "Disk",
            snapshot.disk_used,
            snapshot.disk_total,
            snapshot.disk_pct(),
            stale.disk,
        ),
        format_rate(snapshot.disk_read_rate),
        format_rate(snapshot.disk_write_rate)
    ));
    lines
}
