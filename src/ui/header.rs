use std::time::Duration;

use crate::format::format_uptime;
use crate::system::host::HostInfo;
use crate::theme::ResolvedTheme;

pub fn render(host: &HostInfo, uptime: Duration, theme: ResolvedTheme) -> Vec<String> {
    let mut lines = vec![
        format!("Host: {}", host.hostname),
        format!("Uptime: {}", format_uptime(uptime)),
        format!("OS: {} (kernel {})", host.os_name, host.kernel),
        format!("CPU: {} ({} logical)", host.cpu_model, host.logical_cores),
    ];
    if host.gpus.is_empty() {
        lines.push("GPU: (none detected)".to_string());
    }
    for (i, gpu) in host.gpus.iter().enumerate() {
        lines.push(format!("GPU{}: {gpu}", i + 1));
    }
    lines.push(format!("Theme: {}", theme.label()));
    lines
}
