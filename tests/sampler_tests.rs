use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sysmon::config::{Config, ConfigHandle};
use sysmon::error::{Error, Result, Subsystem};
use sysmon::monitor::{Hub, Monitor};
use sysmon::sampler::{Sampler, SamplerState};
use sysmon::system::process::{ProcessQuery, SortKey, build_process_table};
use sysmon::system::snapshot::Snapshot;
use sysmon::system::source::{
    CpuCounters, CpuTicks, DiskReading, IoCounters, MemoryReading, MetricSource, ProcessReading,
    RawProcess, RawReading,
};

const GIB: u64 = 1024 * 1024 * 1024;

fn raw_process(pid: u32, name: &str, cpu_pct: f32, resident_bytes: u64) -> RawProcess {
    RawProcess {
        pid,
        name: name.into(),
        user: "tester".into(),
        command: format!("/bin/{name}"),
        cpu_pct,
        resident_bytes,
        virtual_bytes: resident_bytes * 2,
        start_time: 0,
    }
}

/// Scripted source: every read advances the tick counters at a fixed busy
/// fraction and reports a fixed process list.
struct FakeSource {
    ticks: CpuTicks,
    busy_per_read: u64,
    io: IoCounters,
    latency: Duration,
    omitted: Vec<u32>,
    fail_everything: bool,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    reads: Arc<AtomicUsize>,
}

impl FakeSource {
    fn new(busy_per_read: u64) -> Self {
        FakeSource {
            ticks: CpuTicks::default(),
            busy_per_read,
            io: IoCounters::default(),
            latency: Duration::ZERO,
            omitted: Vec::new(),
            fail_everything: false,
            active: Arc::new(AtomicUsize::new(0)),
            max_active: Arc::new(AtomicUsize::new(0)),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl MetricSource for FakeSource {
    fn read(&mut self) -> Result<RawReading> {
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        self.reads.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.fail_everything {
            return Err(Error::unavailable(Subsystem::All, "permission denied"));
        }

        self.ticks.busy += self.busy_per_read;
        self.ticks.total += 100;
        self.io.read_bytes += 4096;
        Ok(RawReading {
            cpu: Ok(CpuCounters {
                total: self.ticks,
                per_core: vec![self.ticks],
            }),
            memory: Ok(MemoryReading {
                mem_used: 4 * GIB,
                mem_total: 16 * GIB,
                swap_used: 0,
                swap_total: GIB,
            }),
            disk: Ok(DiskReading {
                used: 50 * GIB,
                total: 100 * GIB,
                io: Some(self.io),
            }),
            processes: Ok(ProcessReading {
                processes: vec![
                    raw_process(1, "init", 0.1, GIB / 16),
                    raw_process(200, "compiler", 80.0, 2 * GIB),
                    raw_process(300, "editor", 5.0, GIB),
                ],
                omitted: self.omitted.clone(),
            }),
        })
    }
}

fn fast_config() -> Config {
    Config {
        interval_seconds: 0.25,
        ..Config::default()
    }
}

fn sampler(source: FakeSource, config: &ConfigHandle) -> (Sampler<FakeSource>, Arc<Hub>) {
    let hub = Arc::new(Hub::new(config.current().history_len));
    (Sampler::new(source, config.subscribe(), Arc::clone(&hub)), hub)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn second_sample_reports_cpu_from_tick_deltas() {
    let config = ConfigHandle::new(fast_config());
    let (mut sampler, hub) = sampler(FakeSource::new(50), &config);

    let first = sampler.sample_now().await.expect("idle sampler polls");
    assert_eq!(first.cpu_total_pct, 0.0);
    assert!(!first.is_degraded());

    let second = sampler.sample_now().await.expect("idle sampler polls");
    assert_eq!(second.cpu_total_pct, 50.0);
    assert_eq!(second.cpu_per_core, vec![50.0]);
    assert!(second.timestamp > first.timestamp);
    assert!(second.disk_read_rate > 0.0);
    assert_eq!(second.mem_pct(), 25.0);

    assert_eq!(hub.len(), 2);
    assert_eq!(hub.latest().map(|s| s.seq), Some(second.seq));
    assert_eq!(sampler.stats().counts().polls, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn process_memory_share_comes_from_resident_bytes() {
    let config = ConfigHandle::new(fast_config());
    let (mut sampler, _hub) = sampler(FakeSource::new(10), &config);
    let snap = sampler.sample_now().await.expect("idle sampler polls");

    let rows = build_process_table(&snap, &ProcessQuery::sorted_by(SortKey::Memory));
    let pids: Vec<u32> = rows.iter().map(|p| p.pid).collect();
    assert_eq!(pids, vec![200, 300, 1]);
    assert_eq!(rows[0].mem_pct, 12.5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreadable_process_is_omitted_not_fatal() {
    let config = ConfigHandle::new(fast_config());
    let mut source = FakeSource::new(10);
    source.omitted = vec![4242];
    let (mut sampler, _hub) = sampler(source, &config);

    let snap = sampler.sample_now().await.expect("idle sampler polls");
    assert_eq!(snap.processes.len(), 3);
    assert!(snap.processes.iter().all(|p| p.pid != 4242));
    assert_eq!(snap.omitted_pids, vec![4242]);
    assert!(snap.stale.processes);
    assert!(!snap.stale.cpu && !snap.stale.memory && !snap.stale.disk);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn total_source_failure_yields_all_stale_snapshot() {
    let config = ConfigHandle::new(fast_config());
    let mut source = FakeSource::new(10);
    source.fail_everything = true;
    let (mut sampler, hub) = sampler(source, &config);

    let snap = sampler.sample_now().await.expect("idle sampler polls");
    assert!(snap.stale.cpu && snap.stale.memory && snap.stale.swap);
    assert!(snap.stale.disk && snap.stale.processes);
    assert!(snap.processes.is_empty());
    assert_eq!(
        snap.errors,
        vec![Error::unavailable(Subsystem::All, "permission denied")]
    );
    assert_eq!(hub.len(), 1);
    assert_eq!(sampler.stats().counts().degraded, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_read_times_out_and_is_published_degraded() {
    let config = ConfigHandle::new(Config {
        sample_timeout_ms: 20,
        ..fast_config()
    });
    let mut source = FakeSource::new(10);
    source.latency = Duration::from_millis(150);
    let (mut sampler, hub) = sampler(source, &config);

    let snap = sampler.sample_now().await.expect("idle sampler polls");
    assert!(snap.is_degraded());
    assert_eq!(sampler.stats().counts().timed_out, 1);
    assert_eq!(hub.len(), 1);

    // The late read still holds the gate, so an immediate retry is dropped.
    assert_eq!(sampler.in_flight().state(), SamplerState::InFlight);
    assert!(sampler.sample_now().await.is_none());
    assert_eq!(sampler.stats().counts().dropped, 1);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(sampler.in_flight().state(), SamplerState::Idle);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn overlapping_ticks_are_dropped_not_queued() {
    let mut source = FakeSource::new(10);
    source.latency = Duration::from_millis(400);
    let max_active = Arc::clone(&source.max_active);
    let reads = Arc::clone(&source.reads);
    let config = ConfigHandle::new(Config {
        sample_timeout_ms: 50,
        ..fast_config()
    });

    let monitor = Monitor::spawn(source, config);
    tokio::time::sleep(Duration::from_millis(1_150)).await;
    let counts = monitor.stats();
    let window = monitor.window(100);
    monitor.shutdown().await;

    assert_eq!(max_active.load(Ordering::SeqCst), 1);
    assert!(counts.dropped >= 1, "expected dropped ticks, got {counts:?}");
    assert!(counts.timed_out >= 1);
    assert!(reads.load(Ordering::SeqCst) <= counts.polls as usize);
    assert!(!window.is_empty());
    assert!(window.iter().all(|s| s.is_degraded()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn push_and_pull_observe_the_same_snapshots() {
    let monitor = Monitor::spawn(FakeSource::new(25), ConfigHandle::new(fast_config()));
    let pushed: Arc<Mutex<Vec<u64>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&pushed);
    monitor.subscribe(move |snap: &Arc<Snapshot>| {
        sink.lock().unwrap().push(snap.seq);
    });

    tokio::time::sleep(Duration::from_millis(900)).await;
    // Sinks run after the ring is updated, so reading in this order sees
    // every pushed snapshot in the pulled window.
    let latest = monitor.latest().expect("at least one snapshot");
    let pushed = pushed.lock().unwrap().clone();
    let pulled: Vec<u64> = monitor.window(100).iter().map(|s| s.seq).collect();
    monitor.shutdown().await;

    assert!(!pushed.is_empty());
    assert!(pushed.iter().all(|seq| pulled.contains(seq)));
    assert!(pulled.windows(2).all(|w| w[0] < w[1]));
    assert!(pulled.last().is_some_and(|seq| *seq >= latest.seq));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn interval_change_applies_without_restart() {
    let config = ConfigHandle::new(Config {
        interval_seconds: 10.0,
        ..Config::default()
    });
    let monitor = Monitor::spawn(FakeSource::new(10), config.clone());

    // The first tick fires immediately; the next would be 10s away.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(monitor.window(100).len(), 1);

    config.update(|c| c.with_interval(0.25));
    tokio::time::sleep(Duration::from_millis(700)).await;
    let taken = monitor.window(100).len();
    monitor.shutdown().await;

    assert!(taken >= 3, "expected faster sampling, got {taken} snapshots");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn history_is_bounded_by_configured_length() {
    let config = ConfigHandle::new(Config {
        history_len: 2,
        ..fast_config()
    });
    let (mut sampler, hub) = sampler(FakeSource::new(10), &config);
    for _ in 0..5 {
        sampler.sample_now().await.expect("idle sampler polls");
    }
    let seqs: Vec<u64> = hub.window(10).iter().map(|s| s.seq).collect();
    assert_eq!(seqs, vec![4, 5]);
}
