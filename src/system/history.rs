use std::collections::VecDeque;
use std::sync::Arc;

use super::snapshot::Snapshot;

pub const DEFAULT_CAPACITY: usize = 60;
/// Larger rings grow on demand instead of reserving up front.
const PREALLOC_LIMIT: usize = 256;

/// Bounded FIFO of published snapshots, oldest first.
#[derive(Debug)]
pub struct HistoryRing {
    entries: VecDeque<Arc<Snapshot>>,
    capacity: usize,
}

impl HistoryRing {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(PREALLOC_LIMIT)),
            capacity,
        }
    }

    /// Append a snapshot, evicting the oldest when full. Snapshots that do
    /// not advance the timestamp are refused.
    pub fn push(&mut self, snapshot: Arc<Snapshot>) -> bool {
        if let Some(newest) = self.entries.back()
            && snapshot.timestamp <= newest.timestamp
        {
            return false;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(snapshot);
        true
    }

    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.entries.back().cloned()
    }

    /// The newest `n` snapshots, oldest first.
    pub fn window(&self, n: usize) -> Vec<Arc<Snapshot>> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Snapshot>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total CPU series for sparklines, oldest first.
    pub fn cpu_history(&self) -> Vec<f32> {
        self.entries.iter().map(|s| s.cpu_total_pct).collect()
    }

    /// Mean total CPU over the newest `n` fresh samples.
    pub fn mean_cpu(&self, n: usize) -> Option<f32> {
        let values: Vec<f32> = self
            .entries
            .iter()
            .rev()
            .filter(|s| !s.stale.cpu)
            .take(n)
            .map(|s| s.cpu_total_pct)
            .collect();
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f32>() / values.len() as f32)
    }
}

impl Default for HistoryRing {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
