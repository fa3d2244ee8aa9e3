use crate::format::{format_bytes, format_uptime, truncate_unicode};
use crate::system::process::ProcessInfo;

const USER_WIDTH: usize = 10;

fn row(cells: [&str; 8]) -> String {
    let [pid, user, cpu, mem, virt, res, elapsed, cmd] = cells;
    format!("{pid:>7} {user:<10} {cpu:>5} {mem:>5} {virt:>9} {res:>9} {elapsed:>10} {cmd}")
        .trim_end()
        .to_string()
}

/// Header plus one line per process. `now` is unix seconds; ELAPSED is the
/// time since the process started.
pub fn render(rows: &[ProcessInfo], now: u64) -> Vec<String> {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(row(["PID", "USER", "%CPU", "%MEM", "VIRT", "RES", "ELAPSED", "CMD"]));
    for p in rows {
        let runtime = std::time::Duration::from_secs(now.saturating_sub(p.start_time));
        lines.push(row([
            &p.pid.to_string(),
            &truncate_unicode(&p.user, USER_WIDTH),
            &format!("{:.1}", p.cpu_pct),
            &format!("{:.1}", p.mem_pct),
            &format_bytes(p.virtual_bytes),
            &format_bytes(p.resident_bytes),
            &format_uptime(runtime),
            &p.command,
        ]));
    }
    lines
}
