use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use sysinfo::System;

use super::platform;

/// Static facts about the machine, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostInfo {
    pub hostname: String,
    pub os_name: String,
    pub kernel: String,
    pub cpu_model: String,
    pub logical_cores: usize,
    /// Display and 3D controllers; empty when none were found.
    pub gpus: Vec<String>,
    /// Unix seconds.
    pub boot_time: u64,
}

impl HostInfo {
    pub fn gather(sys: &System) -> Self {
        let unknown = || "unknown".to_string();
        HostInfo {
            hostname: System::host_name().unwrap_or_else(unknown),
            os_name: System::long_os_version()
                .or_else(System::name)
                .unwrap_or_else(unknown),
            kernel: System::kernel_version().unwrap_or_else(unknown),
            cpu_model: sys
                .cpus()
                .first()
                .map(|cpu| cpu.brand().trim().to_string())
                .filter(|brand| !brand.is_empty())
                .unwrap_or_else(|| "Unknown CPU".to_string()),
            logical_cores: sys.cpus().len(),
            gpus: platform::gpus(),
            boot_time: System::boot_time(),
        }
    }

    pub fn uptime_at(&self, now: SystemTime) -> Duration {
        let now = now
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Duration::from_secs(now.saturating_sub(self.boot_time))
    }

    pub fn uptime(&self) -> Duration {
        self.uptime_at(SystemTime::now())
    }
}
