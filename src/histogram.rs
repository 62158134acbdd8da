//! Fixed-bucket latency histograms.
//!
//! Every histogram shares [`HISTOGRAM_BOUNDS`] plus an implicit `+Inf`
//! bucket. Observations are in seconds; the reported average is in
//! milliseconds while percentiles are reported as bucket bounds in seconds.
//! Percentiles are the bucket-bound estimator below, not exact quantiles of
//! the observed samples.

use serde::{Deserialize, Serialize};

use crate::{HISTOGRAM_BOUNDS, HISTOGRAM_BUCKETS};

/// Per-series bucket counts and running sum.
///
/// Counts are stored per bucket (not cumulatively); cumulative sums are built
/// on read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Histogram {
    counts: [u64; HISTOGRAM_BUCKETS],
    count: u64,
    sum: f64,
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the first bucket whose upper bound is `>= value`. Values above
    /// the last finite bound land in the overflow bucket.
    #[inline]
    pub fn bucket_index(value: f64) -> usize {
        HISTOGRAM_BOUNDS
            .iter()
            .position(|&bound| value <= bound)
            .unwrap_or(HISTOGRAM_BOUNDS.len())
    }

    /// Record one observation in seconds.
    #[inline]
    pub fn observe(&mut self, value: f64) {
        self.counts[Self::bucket_index(value)] += 1;
        self.count += 1;
        self.sum += value;
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Sum of observations in seconds.
    #[inline]
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Count for a single bucket (non-cumulative).
    #[inline]
    pub fn bucket_count(&self, idx: usize) -> u64 {
        self.counts.get(idx).copied().unwrap_or(0)
    }

    /// Count of observations up to and including bucket `idx`.
    pub fn cumulative_count(&self, idx: usize) -> u64 {
        self.counts.iter().take(idx.saturating_add(1)).sum()
    }

    /// Mean observation in milliseconds.
    pub fn avg_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64 * 1_000.0
        }
    }

    /// Bucket-bound percentile estimate in seconds.
    ///
    /// Returns the upper bound of the smallest bucket whose cumulative count
    /// reaches `p * count`. The overflow bucket reports the largest finite
    /// bound. An empty histogram reports `0`.
    pub fn percentile(&self, p: f64) -> f64 {
        if self.count == 0 {
            return 0.0;
        }

        let threshold = p.clamp(0.0, 1.0) * self.count as f64;
        let last_finite = HISTOGRAM_BOUNDS[HISTOGRAM_BOUNDS.len() - 1];
        let mut cumulative = 0u64;

        for (i, count) in self.counts.iter().enumerate() {
            cumulative += count;
            // A zero threshold would otherwise match an empty leading bucket
            if *count == 0 && cumulative == 0 {
                continue;
            }
            if cumulative as f64 >= threshold {
                return HISTOGRAM_BOUNDS.get(i).copied().unwrap_or(last_finite);
            }
        }

        last_finite
    }

    /// Compute the read-only statistics exposed in snapshots.
    pub fn stats(&self) -> HistogramStats {
        HistogramStats {
            count: self.count,
            avg_ms: self.avg_ms(),
            p50: self.percentile(0.50),
            p95: self.percentile(0.95),
            p99: self.percentile(0.99),
        }
    }
}

/// Derived statistics for one histogram series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistogramStats {
    pub count: u64,
    pub avg_ms: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_index_boundaries() {
        assert_eq!(Histogram::bucket_index(0.0), 0);
        assert_eq!(Histogram::bucket_index(0.05), 0);
        assert_eq!(Histogram::bucket_index(0.051), 1);
        assert_eq!(Histogram::bucket_index(0.3), 3);
        assert_eq!(Histogram::bucket_index(30.0), 8);
        assert_eq!(Histogram::bucket_index(30.001), 9);
        assert_eq!(Histogram::bucket_index(f64::INFINITY), 9);
    }

    #[test]
    fn test_identical_observations_share_a_bucket() {
        for n in [1, 2, 7, 100] {
            let mut h = Histogram::new();
            for _ in 0..n {
                h.observe(0.3);
            }
            let stats = h.stats();
            assert_eq!(stats.count, n);
            assert_eq!(stats.p50, 0.5);
            assert_eq!(stats.p95, 0.5);
            assert_eq!(stats.p99, 0.5);
        }
    }

    #[test]
    fn test_average_in_milliseconds() {
        let mut h = Histogram::new();
        h.observe(1.0);
        h.observe(2.0);
        h.observe(3.0);

        assert!((h.avg_ms() - 2000.0).abs() < 1e-9);
        assert_eq!(h.sum(), 6.0);
    }

    #[test]
    fn test_overflow_bucket_reports_largest_finite_bound() {
        let mut h = Histogram::new();
        h.observe(60.0);

        let stats = h.stats();
        assert_eq!(stats.p99, 30.0);
        assert_eq!(stats.p50, 30.0);
        assert!(stats.p99.is_finite());
    }

    #[test]
    fn test_count_matches_bucket_sum() {
        let mut h = Histogram::new();
        for v in [0.01, 0.07, 0.2, 0.4, 0.9, 2.0, 4.0, 9.0, 20.0, 45.0, 0.3] {
            h.observe(v);
        }

        let bucket_sum: u64 = (0..HISTOGRAM_BUCKETS).map(|i| h.bucket_count(i)).sum();
        assert_eq!(bucket_sum, h.count());
        assert_eq!(h.cumulative_count(HISTOGRAM_BUCKETS - 1), h.count());

        // Cumulative counts never decrease
        let cumulative: Vec<u64> = (0..HISTOGRAM_BUCKETS).map(|i| h.cumulative_count(i)).collect();
        assert!(cumulative.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_cumulative_count_past_last_bucket() {
        let mut h = Histogram::new();
        h.observe(0.2);
        h.observe(60.0);

        assert_eq!(h.cumulative_count(usize::MAX), 2);
        assert_eq!(h.cumulative_count(HISTOGRAM_BUCKETS + 5), 2);
        assert_eq!(h.bucket_count(usize::MAX), 0);
    }

    #[test]
    fn test_percentiles_follow_cumulative_threshold() {
        // 90 fast, 9 medium, 1 slow
        let mut h = Histogram::new();
        for _ in 0..90 {
            h.observe(0.02);
        }
        for _ in 0..9 {
            h.observe(0.8);
        }
        h.observe(7.0);

        assert_eq!(h.percentile(0.50), 0.05);
        // cumulative at bucket 4 (<= 1.0) is 99 >= 95
        assert_eq!(h.percentile(0.95), 1.0);
        assert_eq!(h.percentile(0.99), 1.0);
        assert_eq!(h.percentile(1.0), 10.0);
    }

    #[test]
    fn test_empty_histogram_is_all_zero() {
        let h = Histogram::new();
        let stats = h.stats();

        assert_eq!(stats.count, 0);
        assert_eq!(stats.avg_ms, 0.0);
        assert_eq!(stats.p50, 0.0);
        assert_eq!(stats.p99, 0.0);
    }

    #[test]
    fn test_stats_serialize_camel_case() {
        let mut h = Histogram::new();
        h.observe(0.1);
        let json = serde_json::to_value(h.stats()).unwrap();

        assert_eq!(json["count"], 1);
        assert_eq!(json["avgMs"], 100.0);
        assert_eq!(json["p50"], 0.1);
    }
}
