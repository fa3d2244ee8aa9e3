//! The presentation-facing side of the sampler.
//!
//! The sampler task is the only writer of the history ring. Readers get
//! `Arc<Snapshot>` handles to fully built values, either pushed through a
//! [`SnapshotSink`] or pulled with [`Monitor::latest`] / [`Monitor::window`].

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::ConfigHandle;
use crate::sampler::{InFlight, Sampler, SamplerCounts, SamplerState, SamplerStats};
use crate::system::history::HistoryRing;
use crate::system::process::{ProcessInfo, ProcessQuery, build_process_table};
use crate::system::snapshot::Snapshot;
use crate::system::source::MetricSource;

/// Push-style consumer. Called on the sampler task once per published
/// snapshot, so implementations should hand work off rather than block.
pub trait SnapshotSink: Send + Sync {
    fn on_snapshot(&self, snapshot: &Arc<Snapshot>);
}

impl<F> SnapshotSink for F
where
    F: Fn(&Arc<Snapshot>) + Send + Sync,
{
    fn on_snapshot(&self, snapshot: &Arc<Snapshot>) {
        self(snapshot)
    }
}

/// History ring plus the registered sinks.
pub struct Hub {
    history: RwLock<HistoryRing>,
    sinks: RwLock<Vec<Arc<dyn SnapshotSink>>>,
}

impl Hub {
    pub fn new(capacity: usize) -> Self {
        Hub {
            history: RwLock::new(HistoryRing::new(capacity)),
            sinks: RwLock::new(Vec::new()),
        }
    }

    pub fn publish(&self, snapshot: Arc<Snapshot>) {
        {
            let mut history = self.history.write().unwrap_or_else(PoisonError::into_inner);
            if !history.push(Arc::clone(&snapshot)) {
                tracing::warn!(seq = snapshot.seq, "snapshot timestamp did not advance, not recorded");
                return;
            }
        }
        let sinks = self.sinks.read().unwrap_or_else(PoisonError::into_inner).clone();
        for sink in sinks {
            sink.on_snapshot(&snapshot);
        }
    }

    pub fn subscribe(&self, sink: Arc<dyn SnapshotSink>) {
        self.sinks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sink);
    }

    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.history
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .latest()
    }

    pub fn window(&self, n: usize) -> Vec<Arc<Snapshot>> {
        self.history
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .window(n)
    }

    pub fn len(&self) -> usize {
        self.history.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn mean_cpu(&self, n: usize) -> Option<f32> {
        self.history
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .mean_cpu(n)
    }
}

/// A running sampler and its read side. Dropping the monitor stops sampling.
pub struct Monitor {
    hub: Arc<Hub>,
    config: ConfigHandle,
    stats: Arc<SamplerStats>,
    in_flight: Arc<InFlight>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Monitor {
    /// Start sampling on the current tokio runtime.
    pub fn spawn<S: MetricSource>(source: S, config: ConfigHandle) -> Self {
        let hub = Arc::new(Hub::new(config.current().history_len));
        let sampler = Sampler::new(source, config.subscribe(), Arc::clone(&hub));
        let stats = sampler.stats();
        let in_flight = sampler.in_flight();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(sampler.run(shutdown_rx));
        Monitor {
            hub,
            config,
            stats,
            in_flight,
            shutdown,
            task,
        }
    }

    pub fn subscribe(&self, sink: impl SnapshotSink + 'static) {
        self.hub.subscribe(Arc::new(sink));
    }

    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.hub.latest()
    }

    pub fn window(&self, n: usize) -> Vec<Arc<Snapshot>> {
        self.hub.window(n)
    }

    pub fn mean_cpu(&self, n: usize) -> Option<f32> {
        self.hub.mean_cpu(n)
    }

    /// Ranked rows from the newest snapshot.
    pub fn process_table(&self, query: &ProcessQuery) -> Vec<ProcessInfo> {
        self.latest()
            .map(|snapshot| build_process_table(&snapshot, query))
            .unwrap_or_default()
    }

    pub fn stats(&self) -> SamplerCounts {
        self.stats.counts()
    }

    pub fn sampler_state(&self) -> SamplerState {
        self.in_flight.state()
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            tracing::warn!(error = %err, "sampler task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    fn snap(seq: u64) -> Arc<Snapshot> {
        Arc::new(Snapshot {
            seq,
            timestamp: Duration::from_millis(seq),
            ..Snapshot::default()
        })
    }

    #[test]
    fn publish_records_then_notifies() {
        let hub = Hub::new(2);
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        hub.subscribe(Arc::new(move |s: &Arc<Snapshot>| {
            counter.store(s.seq as usize, Ordering::SeqCst);
        }));
        hub.publish(snap(1));
        hub.publish(snap(2));
        hub.publish(snap(3));
        assert_eq!(seen.load(Ordering::SeqCst), 3);
        assert_eq!(hub.len(), 2);
        assert_eq!(hub.latest().map(|s| s.seq), Some(3));
        let seqs: Vec<u64> = hub.window(5).iter().map(|s| s.seq).collect();
        assert_eq!(seqs, vec![2, 3]);
    }

    #[test]
    fn rejected_snapshot_is_not_pushed_to_sinks() {
        let hub = Hub::new(4);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        hub.subscribe(Arc::new(move |_: &Arc<Snapshot>| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        hub.publish(snap(5));
        hub.publish(snap(4));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(hub.len(), 1);
    }
}
