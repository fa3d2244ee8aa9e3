//! Fixed-interval polling of a [`MetricSource`].
//!
//! At most one read is ever in flight. A tick that arrives while a read is
//! still running is dropped, not queued, and a read that outlives the
//! configured timeout is published as a degraded snapshot while the late
//! read finishes in the background.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::watch;
use tokio::time::{Interval, MissedTickBehavior};

use crate::config::Config;
use crate::error::{Error, Subsystem};
use crate::monitor::Hub;
use crate::system::aggregator::Aggregator;
use crate::system::snapshot::Snapshot;
use crate::system::source::MetricSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplerState {
    Idle,
    InFlight,
}

/// Admission gate for reads: Idle -> InFlight only when nothing is running.
#[derive(Debug, Default)]
pub struct InFlight {
    busy: AtomicBool,
}

impl InFlight {
    pub fn try_enter(self: &Arc<Self>) -> Option<InFlightGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard(Arc::clone(self)))
    }

    pub fn state(&self) -> SamplerState {
        if self.busy.load(Ordering::Acquire) {
            SamplerState::InFlight
        } else {
            SamplerState::Idle
        }
    }
}

/// Returns the gate to Idle when the read that holds it completes.
#[derive(Debug)]
pub struct InFlightGuard(Arc<InFlight>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.busy.store(false, Ordering::Release);
    }
}

#[derive(Debug, Default)]
pub struct SamplerStats {
    polls: AtomicU64,
    dropped: AtomicU64,
    timed_out: AtomicU64,
    degraded: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SamplerCounts {
    /// Reads started.
    pub polls: u64,
    /// Ticks skipped because a read was still in flight.
    pub dropped: u64,
    pub timed_out: u64,
    pub degraded: u64,
}

impl SamplerStats {
    pub fn counts(&self) -> SamplerCounts {
        SamplerCounts {
            polls: self.polls.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            degraded: self.degraded.load(Ordering::Relaxed),
        }
    }
}

fn ticker(period: Duration, immediate: bool) -> Interval {
    let start = if immediate {
        tokio::time::Instant::now()
    } else {
        tokio::time::Instant::now() + period
    };
    let mut ticker = tokio::time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

pub struct Sampler<S: MetricSource> {
    source: Arc<Mutex<S>>,
    aggregator: Aggregator,
    in_flight: Arc<InFlight>,
    stats: Arc<SamplerStats>,
    config: watch::Receiver<Arc<Config>>,
    hub: Arc<Hub>,
    started: Instant,
}

impl<S: MetricSource> Sampler<S> {
    pub fn new(source: S, config: watch::Receiver<Arc<Config>>, hub: Arc<Hub>) -> Self {
        Sampler {
            source: Arc::new(Mutex::new(source)),
            aggregator: Aggregator::new(),
            in_flight: Arc::new(InFlight::default()),
            stats: Arc::new(SamplerStats::default()),
            config,
            hub,
            started: Instant::now(),
        }
    }

    pub fn stats(&self) -> Arc<SamplerStats> {
        Arc::clone(&self.stats)
    }

    pub fn in_flight(&self) -> Arc<InFlight> {
        Arc::clone(&self.in_flight)
    }

    /// Poll once right now. Returns `None` when a previous read is still in
    /// flight and this request was dropped.
    pub async fn sample_now(&mut self) -> Option<Arc<Snapshot>> {
        let Some(guard) = self.in_flight.try_enter() else {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("previous poll still in flight, dropping tick");
            return None;
        };
        self.stats.polls.fetch_add(1, Ordering::Relaxed);

        let timeout = self.config.borrow().sample_timeout();
        let source = Arc::clone(&self.source);
        let read = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            let mut source = source.lock().unwrap_or_else(PoisonError::into_inner);
            source.read()
        });

        let reading = match tokio::time::timeout(timeout, read).await {
            Ok(Ok(reading)) => reading,
            Ok(Err(join_err)) => Err(Error::unavailable(
                Subsystem::All,
                format!("metric source failed: {join_err}"),
            )),
            Err(_) => {
                self.stats.timed_out.fetch_add(1, Ordering::Relaxed);
                Err(Error::unavailable(
                    Subsystem::All,
                    format!("metric source timed out after {timeout:?}"),
                ))
            }
        };

        let snapshot = Arc::new(self.aggregator.ingest(self.started.elapsed(), reading));
        if snapshot.is_degraded() {
            self.stats.degraded.fetch_add(1, Ordering::Relaxed);
        }
        self.hub.publish(Arc::clone(&snapshot));
        Some(snapshot)
    }

    /// Tick until `shutdown` flips to true or its sender is dropped. An
    /// interval change takes effect one new period after it is observed.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut period = self.config.borrow_and_update().interval();
        let mut ticks = ticker(period, true);
        let mut config_open = true;
        tracing::debug!(?period, "sampler started");

        loop {
            tokio::select! {
                _ = ticks.tick() => {}
                changed = self.config.changed(), if config_open => {
                    if changed.is_err() {
                        config_open = false;
                        continue;
                    }
                    let next = self.config.borrow_and_update().interval();
                    if next != period {
                        tracing::info!(from = ?period, to = ?next, "sampling interval changed");
                        period = next;
                        ticks = ticker(period, false);
                    }
                    continue;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            self.sample_now().await;
        }
        tracing::debug!("sampler stopped");
    }
}
