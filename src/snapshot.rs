//! Point-in-time copies of the registry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::histogram::HistogramStats;
use crate::system::SystemMetrics;
use crate::timestamp::Timestamp;

/// An immutable read of every series at one instant.
///
/// Maps are owned copies keyed by series key, so a snapshot is unaffected by
/// later registry mutations and can be kept in a history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub timestamp: Timestamp,
    pub counters: BTreeMap<String, f64>,
    pub gauges: BTreeMap<String, f64>,
    pub histograms: BTreeMap<String, HistogramStats>,
    pub system: SystemMetrics,
}

impl Snapshot {
    /// An empty snapshot at `timestamp`.
    pub fn empty(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            counters: BTreeMap::new(),
            gauges: BTreeMap::new(),
            histograms: BTreeMap::new(),
            system: SystemMetrics::default(),
        }
    }

    #[inline]
    pub fn counter(&self, key: &str) -> Option<f64> {
        self.counters.get(key).copied()
    }

    #[inline]
    pub fn gauge(&self, key: &str) -> Option<f64> {
        self.gauges.get(key).copied()
    }

    #[inline]
    pub fn histogram(&self, key: &str) -> Option<&HistogramStats> {
        self.histograms.get(key)
    }

    /// Numeric value of a series for trend display: a counter, else a gauge,
    /// else a histogram's average in milliseconds.
    pub fn series_value(&self, key: &str) -> Option<f64> {
        self.counter(key)
            .or_else(|| self.gauge(key))
            .or_else(|| self.histogram(key).map(|h| h.avg_ms))
    }

    /// Whether no counter, gauge or histogram series is present.
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty() && self.gauges.is_empty() && self.histograms.is_empty()
    }

    /// Number of series across all three maps.
    pub fn series_count(&self) -> usize {
        self.counters.len() + self.gauges.len() + self.histograms.len()
    }
}
