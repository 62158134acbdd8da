// ============================================================================
// METRICS REGISTRY
// ============================================================================
// The single authoritative store of counters, gauges, histograms and the
// system record. One lock guards the whole state, so every mutation and every
// snapshot is atomic with respect to the others and a snapshot is always a
// consistent point-in-time copy.
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use compact_str::CompactString;
use parking_lot::RwLock;
use quanta::Clock;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::config::RegistryConfig;
use crate::histogram::Histogram;
use crate::labels::{filter_labels, series_key, LabelKey};
use crate::snapshot::Snapshot;
use crate::system::{SystemMetrics, SystemMetricsUpdate};
use crate::timer::{OwnedTimerHandle, TimerHandle};
use crate::timestamp::Timestamp;

#[derive(Debug, Default)]
struct RegistryState {
    counters: HashMap<CompactString, f64>,
    gauges: HashMap<CompactString, f64>,
    histograms: HashMap<CompactString, Histogram>,
    system: SystemMetrics,
}

/// Process-wide metrics store.
///
/// Construct one at the composition root and share it (usually as
/// `Arc<MetricsRegistry>`) with everything that records metrics. Tests build
/// their own instance instead of resetting a global.
///
/// Every operation is total. Disallowed label keys are dropped; negative or
/// non-finite counter increments and non-finite gauge or histogram values are
/// ignored.
pub struct MetricsRegistry {
    state: RwLock<RegistryState>,
    allowed_labels: SmallVec<[LabelKey; 8]>,
    clock: Clock,
}

impl MetricsRegistry {
    /// Registry accepting every [`LabelKey`], timed by the system clock.
    pub fn new() -> Self {
        Self::with_config(&RegistryConfig::default())
    }

    /// Registry restricted to the label keys named in `config`.
    pub fn with_config(config: &RegistryConfig) -> Self {
        let mut allowed_labels: SmallVec<[LabelKey; 8]> =
            config.allowed_label_keys.iter().copied().collect();
        allowed_labels.sort();
        allowed_labels.dedup();

        Self {
            state: RwLock::new(RegistryState::default()),
            allowed_labels,
            clock: Clock::new(),
        }
    }

    /// Replace the clock used by timers. Tests pass a `Clock::mock()`.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[inline]
    pub(crate) fn clock_now(&self) -> quanta::Instant {
        self.clock.now()
    }

    /// Label keys this registry keeps.
    pub fn allowed_labels(&self) -> &[LabelKey] {
        &self.allowed_labels
    }

    #[inline]
    fn key(&self, name: &str, labels: &[(&str, &str)]) -> CompactString {
        series_key(name, &filter_labels(&self.allowed_labels, labels))
    }

    // ------------------------------------------------------------------------
    // Ingestion
    // ------------------------------------------------------------------------

    /// Add `amount` to a counter, creating it at zero on first use.
    pub fn increment_counter(&self, name: &str, labels: &[(&str, &str)], amount: f64) {
        if !amount.is_finite() || amount < 0.0 {
            debug!(
                target: "metrics_collector::registry",
                metric = name,
                amount,
                "Ignoring invalid counter increment"
            );
            return;
        }

        let key = self.key(name, labels);
        let mut state = self.state.write();
        let value = state.counters.entry(key).or_insert(0.0);
        *value += amount;
        crate::log_metric!(name, *value, kind = "counter");
    }

    /// Increment a counter by one.
    #[inline]
    pub fn inc(&self, name: &str, labels: &[(&str, &str)]) {
        self.increment_counter(name, labels, 1.0);
    }

    /// Overwrite a gauge.
    pub fn set_gauge(&self, name: &str, value: f64, labels: &[(&str, &str)]) {
        if !value.is_finite() {
            debug!(
                target: "metrics_collector::registry",
                metric = name,
                value,
                "Ignoring non-finite gauge value"
            );
            return;
        }

        let key = self.key(name, labels);
        self.state.write().gauges.insert(key, value);
        crate::log_metric!(name, value, kind = "gauge");
    }

    /// Record one observation, in seconds, into a histogram.
    pub fn observe_histogram(&self, name: &str, value_seconds: f64, labels: &[(&str, &str)]) {
        let key = self.key(name, labels);
        self.observe_series(key, value_seconds);
    }

    /// Observe into an already-rendered series key.
    pub(crate) fn observe_series(&self, key: CompactString, value_seconds: f64) {
        if !value_seconds.is_finite() {
            debug!(
                target: "metrics_collector::registry",
                series = %key,
                value_seconds,
                "Ignoring non-finite histogram observation"
            );
            return;
        }

        trace!(
            target: "metrics_collector::registry",
            series = %key,
            value_seconds,
            "Histogram observation"
        );
        self.state
            .write()
            .histograms
            .entry(key)
            .or_default()
            .observe(value_seconds);
    }

    /// Start timing an operation. Calling [`TimerHandle::end`] records the
    /// elapsed seconds into histogram `name`.
    pub fn start_timer(&self, name: &str, labels: &[(&str, &str)]) -> TimerHandle<&Self> {
        TimerHandle::new(self, self.key(name, labels), self.clock_now())
    }

    /// Like [`start_timer`](Self::start_timer), but the handle holds its own
    /// `Arc` so it can outlive the caller's borrow or move into a task.
    pub fn start_owned_timer(self: &Arc<Self>, name: &str, labels: &[(&str, &str)]) -> OwnedTimerHandle {
        TimerHandle::new(Arc::clone(self), self.key(name, labels), self.clock_now())
    }

    /// Merge a partial system-metrics update. Unset fields keep their value.
    pub fn update_system_metrics(&self, update: &SystemMetricsUpdate) {
        self.state.write().system.apply(update);
        trace!(target: "metrics_collector::registry", ?update, "System metrics updated");
    }

    // ------------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------------

    /// Copy the current state. The timestamp is read at call time.
    pub fn snapshot(&self) -> Snapshot {
        let state = self.state.read();

        Snapshot {
            timestamp: Timestamp::now(),
            counters: state
                .counters
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            gauges: state
                .gauges
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            histograms: state
                .histograms
                .iter()
                .map(|(k, h)| (k.to_string(), h.stats()))
                .collect(),
            system: state.system,
        }
    }

    /// Current system record.
    pub fn system_metrics(&self) -> SystemMetrics {
        self.state.read().system
    }

    /// Number of distinct series across counters, gauges and histograms.
    pub fn series_count(&self) -> usize {
        let state = self.state.read();
        state.counters.len() + state.gauges.len() + state.histograms.len()
    }

    /// Drop every series and zero the system record.
    pub fn reset(&self) {
        let mut state = self.state.write();
        let dropped = state.counters.len() + state.gauges.len() + state.histograms.len();
        *state = RegistryState::default();
        debug!(target: "metrics_collector::registry", dropped, "Registry reset");
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("allowed_labels", &self.allowed_labels)
            .field("series", &self.series_count())
            .finish()
    }
}
