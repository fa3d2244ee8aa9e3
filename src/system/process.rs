use std::cmp::Ordering;

use serde::Serialize;

use super::snapshot::Snapshot;

/// One row of the process table. PIDs are unique only within one snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub user: String,
    pub cpu_pct: f32,
    pub mem_pct: f32,
    pub command: String,
    pub name: String,
    pub virtual_bytes: u64,
    pub resident_bytes: u64,
    /// Unix seconds.
    pub start_time: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Cpu,
    Memory,
    Pid,
}

impl SortKey {
    pub fn next(self) -> Self {
        match self {
            SortKey::Cpu => SortKey::Memory,
            SortKey::Memory => SortKey::Pid,
            SortKey::Pid => SortKey::Cpu,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortKey::Cpu => "%CPU",
            SortKey::Memory => "%MEM",
            SortKey::Pid => "PID",
        }
    }

    pub fn from_str_config(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "mem" | "memory" => SortKey::Memory,
            "pid" => SortKey::Pid,
            _ => SortKey::Cpu,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessFilter {
    /// Exact user name.
    pub user: Option<String>,
    /// Case-insensitive substring of the name or command line.
    pub name: Option<String>,
}

impl ProcessFilter {
    pub fn is_empty(&self) -> bool {
        self.user.is_none() && self.name.is_none()
    }

    pub fn matches(&self, process: &ProcessInfo) -> bool {
        if let Some(user) = &self.user
            && process.user != *user
        {
            return false;
        }
        if let Some(needle) = &self.name {
            let needle = needle.to_lowercase();
            return process.name.to_lowercase().contains(&needle)
                || process.command.to_lowercase().contains(&needle);
        }
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessQuery {
    pub sort: SortKey,
    pub filter: ProcessFilter,
    /// Keep at most this many rows; `None` keeps all.
    pub limit: Option<usize>,
}

impl ProcessQuery {
    pub fn sorted_by(sort: SortKey) -> Self {
        Self {
            sort,
            ..Self::default()
        }
    }
}

/// NaN sorts below every real value.
fn descending(a: f32, b: f32) -> Ordering {
    let key = |v: f32| if v.is_nan() { f32::NEG_INFINITY } else { v };
    key(b).total_cmp(&key(a))
}

pub fn compare(sort: SortKey, a: &ProcessInfo, b: &ProcessInfo) -> Ordering {
    let primary = match sort {
        SortKey::Cpu => descending(a.cpu_pct, b.cpu_pct),
        SortKey::Memory => descending(a.mem_pct, b.mem_pct),
        SortKey::Pid => Ordering::Equal,
    };
    primary.then_with(|| a.pid.cmp(&b.pid))
}

/// Ranked, filtered view of a snapshot's processes. Ties always fall back to
/// ascending PID, so the same input yields the same rows.
pub fn build_process_table(snapshot: &Snapshot, query: &ProcessQuery) -> Vec<ProcessInfo> {
    let mut rows: Vec<ProcessInfo> = snapshot
        .processes
        .iter()
        .filter(|p| query.filter.matches(p))
        .cloned()
        .collect();
    rows.sort_by(|a, b| compare(query.sort, a, b));
    if let Some(limit) = query.limit {
        rows.truncate(limit);
    }
    rows
}
