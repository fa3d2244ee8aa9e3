use std::time::Duration;

use crate::sampler::SamplerCounts;
use crate::system::snapshot::Snapshot;

pub fn render(
    snapshot: &Snapshot,
    interval: Duration,
    counts: SamplerCounts,
    mean_cpu: Option<f32>,
) -> String {
    let mut parts = vec![
        format!("#{}", snapshot.seq),
        format!("Processes: {}", snapshot.processes.len()),
        format!("Interval: {:.1}s", interval.as_secs_f64()),
    ];
    if let Some(mean) = mean_cpu {
        parts.push(format!("CPU avg: {mean:.1}%"));
    }
    if counts.dropped > 0 || counts.timed_out > 0 {
        parts.push(format!(
            "dropped {} / timed out {}",
            counts.dropped, counts.timed_out
        ));
    }
    if !snapshot.omitted_pids.is_empty() {
        parts.push(format!("{} unreadable", snapshot.omitted_pids.len()));
    }
    for err in &snapshot.errors {
        parts.push(err.to_string());
    }
    parts.join(" | ")
}
