// ============================================================================
// SNAPSHOT SAMPLER
// ============================================================================
// Periodically snapshots a shared registry into a bounded history. Each tick
// measures event-loop lag, optionally refreshes the system record from the
// host probe, then snapshots and appends.
// ============================================================================

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, trace, warn};

use crate::config::SamplerConfig;
use crate::error::{MetricsResult, SamplerError};
use crate::history::SnapshotHistory;
use crate::registry::MetricsRegistry;
use crate::snapshot::Snapshot;
use crate::system::{SystemMetricsUpdate, SystemProbe};

/// Drives snapshots of a [`MetricsRegistry`] into a [`SnapshotHistory`].
pub struct Sampler {
    registry: Arc<MetricsRegistry>,
    history: Arc<RwLock<SnapshotHistory>>,
    probe: Option<Mutex<SystemProbe>>,
    interval: Duration,
    /// Shutdown signal
    shutdown: Arc<Notify>,
    /// Running flag
    running: AtomicBool,
    ticks: AtomicU64,
    last_tick: Mutex<Option<Instant>>,
}

impl Sampler {
    /// Build a sampler for `registry`. If the system probe cannot be created
    /// the sampler still runs, recording only event-loop lag.
    pub fn new(registry: Arc<MetricsRegistry>, config: &SamplerConfig) -> Self {
        let probe = if config.collect_system_metrics {
            match SystemProbe::new() {
                Ok(probe) => Some(Mutex::new(probe)),
                Err(e) => {
                    warn!(
                        target: "metrics_collector::sampler",
                        error = %e,
                        "System probe unavailable, sampling without host metrics"
                    );
                    None
                }
            }
        } else {
            None
        };

        Self {
            registry,
            history: Arc::new(RwLock::new(SnapshotHistory::new(config.history_capacity))),
            probe,
            interval: config.interval(),
            shutdown: Arc::new(Notify::new()),
            running: AtomicBool::new(false),
            ticks: AtomicU64::new(0),
            last_tick: Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &Arc<MetricsRegistry> {
        &self.registry
    }

    /// Shared handle to the history, for readers such as a UI poller.
    pub fn history(&self) -> Arc<RwLock<SnapshotHistory>> {
        Arc::clone(&self.history)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.running.load(AtomicOrdering::Relaxed)
    }

    /// Ticks completed since construction.
    pub fn tick_count(&self) -> u64 {
        self.ticks.load(AtomicOrdering::Relaxed)
    }

    /// Run one sampling cycle and return the snapshot it appended.
    ///
    /// Lag is how much later than one interval this tick came after the
    /// previous one; the first tick reports zero.
    pub fn tick(&self) -> Snapshot {
        let now = Instant::now();
        let lag = match self.last_tick.lock().replace(now) {
            Some(previous) => now
                .duration_since(previous)
                .saturating_sub(self.interval),
            None => Duration::ZERO,
        };
        let lag_ms = lag.as_secs_f64() * 1000.0;

        let update = match &self.probe {
            Some(probe) => probe.lock().sample(lag_ms),
            None => SystemMetricsUpdate::new().with_event_loop_lag_ms(lag_ms),
        };
        self.registry.update_system_metrics(&update);

        let snapshot = self.registry.snapshot();
        let evicted = self.history.write().push(snapshot.clone());
        let tick = self.ticks.fetch_add(1, AtomicOrdering::Relaxed) + 1;

        trace!(
            target: "metrics_collector::sampler",
            tick,
            lag_ms,
            series = snapshot.series_count(),
            evicted = evicted.is_some(),
            "Snapshot taken"
        );

        snapshot
    }

    /// Signal the running loop to stop.
    pub fn shutdown(&self) -> Result<(), SamplerError> {
        if !self.running.swap(false, AtomicOrdering::AcqRel) {
            return Err(SamplerError::NotRunning);
        }
        info!(target: "metrics_collector::sampler", "Shutdown signal received");
        self.shutdown.notify_waiters();
        Ok(())
    }

    /// Tick every interval until [`shutdown`](Self::shutdown) is called or,
    /// when `max_ticks` is set, that many ticks have run.
    pub async fn run(&self, max_ticks: Option<u64>) -> MetricsResult<()> {
        if self
            .running
            .compare_exchange(false, true, AtomicOrdering::AcqRel, AtomicOrdering::Acquire)
            .is_err()
        {
            return Err(SamplerError::AlreadyRunning.into());
        }

        info!(
            target: "metrics_collector::sampler",
            interval_ms = self.interval.as_millis() as u64,
            max_ticks,
            system_probe = self.probe.is_some(),
            "Sampler started"
        );
        crate::log_sampler!("start");

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut completed = 0u64;

        loop {
            // Registered before the flag check so a shutdown in between is not lost.
            let notified = self.shutdown.notified();
            if !self.running.load(AtomicOrdering::Acquire) {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {
                    self.tick();
                    completed += 1;
                    if max_ticks.is_some_and(|max| completed >= max) {
                        break;
                    }
                }
                _ = notified => {
                    crate::log_sampler!("shutdown");
                    break;
                }
            }
        }

        self.running.store(false, AtomicOrdering::Release);
        info!(target: "metrics_collector::sampler", ticks = completed, "Sampler stopped");
        Ok(())
    }
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler")
            .field("interval", &self.interval)
            .field("running", &self.is_running())
            .field("ticks", &self.tick_count())
            .field("system_probe", &self.probe.is_some())
            .finish()
    }
}
