//! Derived dashboard statistics over snapshots.
//!
//! Pure functions; none of them touch the registry. Histories are accepted as
//! any oldest-first sequence of `&Snapshot` that can be walked from both ends,
//! so a [`SnapshotHistory`](crate::SnapshotHistory), a slice or a `Vec` all
//! work. Absent series read as zero here, and every division is guarded so
//! the result is always a finite number.

use std::time::Duration;

use crate::labels::is_series_of;
use crate::snapshot::Snapshot;

/// Per-second rate of a counter from the two most recent snapshots that
/// contain it.
///
/// Returns `0` with fewer than two such snapshots, when the elapsed time
/// between them is not positive, or when the counter went backwards (the
/// registry was reset between the two readings).
pub fn calculate_rate<'a, I>(history: I, counter: &str) -> f64
where
    I: IntoIterator<Item = &'a Snapshot>,
    I::IntoIter: DoubleEndedIterator,
{
    let mut readings = history
        .into_iter()
        .rev()
        .filter_map(|s| s.counter(counter).map(|v| (s, v)));

    let (Some((later, later_value)), Some((earlier, earlier_value))) =
        (readings.next(), readings.next())
    else {
        return 0.0;
    };

    rate_between(earlier, earlier_value, later, later_value)
}

/// Per-second rate of a counter between the oldest and newest snapshots that
/// contain it within `window` of the newest one.
///
/// Smooths over sampling jitter compared to [`calculate_rate`]. Same zero
/// guards apply.
pub fn calculate_rate_over_window<'a, I>(history: I, counter: &str, window: Duration) -> f64
where
    I: IntoIterator<Item = &'a Snapshot>,
    I::IntoIter: DoubleEndedIterator,
{
    let mut readings = history
        .into_iter()
        .rev()
        .filter_map(|s| s.counter(counter).map(|v| (s, v)));

    let Some((later, later_value)) = readings.next() else {
        return 0.0;
    };
    let window_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
    let window_start = later.timestamp.as_millis().saturating_sub(window_ms);

    let earliest = readings
        .take_while(|(s, _)| s.timestamp.as_millis() >= window_start)
        .last();

    match earliest {
        Some((earlier, earlier_value)) => rate_between(earlier, earlier_value, later, later_value),
        None => 0.0,
    }
}

fn rate_between(earlier: &Snapshot, earlier_value: f64, later: &Snapshot, later_value: f64) -> f64 {
    let elapsed = later.timestamp.seconds_since(earlier.timestamp);
    if elapsed <= 0.0 {
        return 0.0;
    }

    let delta = later_value - earlier_value;
    if delta < 0.0 {
        return 0.0;
    }

    delta / elapsed
}

/// `100 * error / total` from one snapshot's counters. Zero when the total is
/// zero or absent.
pub fn calculate_error_percentage(snapshot: &Snapshot, error_counter: &str, total_counter: &str) -> f64 {
    let total = snapshot.counter(total_counter).unwrap_or(0.0);
    if total <= 0.0 {
        return 0.0;
    }

    let errors = snapshot.counter(error_counter).unwrap_or(0.0);
    100.0 * errors / total
}

/// Error share across every series of counter `name`.
///
/// The total is the sum of all series of `name` (bare or labeled); the errors
/// are the series labeled `status="error"`. Zero when there is no traffic.
pub fn error_percentage_by_status(snapshot: &Snapshot, name: &str) -> f64 {
    let (errors, total) = snapshot
        .counters
        .iter()
        .filter(|(key, _)| is_series_of(key, name))
        .fold((0.0, 0.0), |(errors, total), (key, value)| {
            if key.contains("status=\"error\"") {
                (errors + value, total + value)
            } else {
                (errors, total + value)
            }
        });

    if total <= 0.0 {
        0.0
    } else {
        100.0 * errors / total
    }
}

/// Up to `max_points` most recent values of a series, oldest first.
///
/// The series is looked up as a counter, then a gauge, then a histogram's
/// average in milliseconds. Snapshots without it contribute `0`.
pub fn sparkline_data<'a, I>(history: I, series: &str, max_points: usize) -> Vec<f64>
where
    I: IntoIterator<Item = &'a Snapshot>,
    I::IntoIter: DoubleEndedIterator,
{
    sparkline_with(history, max_points, |s| s.series_value(series).unwrap_or(0.0))
}

/// Up to `max_points` most recent values of `extract`, oldest first. Used for
/// fields of the system record.
pub fn sparkline_with<'a, I, F>(history: I, max_points: usize, extract: F) -> Vec<f64>
where
    I: IntoIterator<Item = &'a Snapshot>,
    I::IntoIter: DoubleEndedIterator,
    F: Fn(&Snapshot) -> f64,
{
    let mut points: Vec<f64> = history
        .into_iter()
        .rev()
        .take(max_points)
        .map(extract)
        .collect();
    points.reverse();
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::HistogramStats;
    use crate::history::SnapshotHistory;
    use crate::timestamp::Timestamp;
    use pretty_assertions::assert_eq;

    fn snap(ms: i64, counters: &[(&str, f64)]) -> Snapshot {
        let mut s = Snapshot::empty(Timestamp::from_millis(ms));
        for (k, v) in counters {
            s.counters.insert((*k).to_string(), *v);
        }
        s
    }

    #[test]
    fn test_rate_from_two_latest_points() {
        let history = vec![
            snap(0, &[("req", 0.0)]),
            snap(1_000, &[("req", 10.0)]),
            snap(3_000, &[("req", 50.0)]),
        ];
        assert_eq!(calculate_rate(&history, "req"), 20.0);
    }

    #[test]
    fn test_rate_skips_snapshots_missing_the_counter() {
        let history = vec![
            snap(0, &[("req", 4.0)]),
            snap(1_000, &[]),
            snap(2_000, &[("req", 8.0)]),
        ];
        assert_eq!(calculate_rate(&history, "req"), 2.0);
    }

    #[test]
    fn test_rate_zero_guards() {
        let empty: Vec<Snapshot> = Vec::new();
        assert_eq!(calculate_rate(&empty, "req"), 0.0);

        let single = vec![snap(0, &[("req", 5.0)])];
        assert_eq!(calculate_rate(&single, "req"), 0.0);

        let absent = vec![snap(0, &[]), snap(1_000, &[])];
        assert_eq!(calculate_rate(&absent, "req"), 0.0);

        let same_time = vec![snap(1_000, &[("req", 1.0)]), snap(1_000, &[("req", 9.0)])];
        assert_eq!(calculate_rate(&same_time, "req"), 0.0);

        let skewed = vec![snap(2_000, &[("req", 1.0)]), snap(1_000, &[("req", 9.0)])];
        assert_eq!(calculate_rate(&skewed, "req"), 0.0);
    }

    #[test]
    fn test_rate_after_reset_is_zero() {
        let history = vec![snap(0, &[("req", 100.0)]), snap(1_000, &[("req", 3.0)])];
        assert_eq!(calculate_rate(&history, "req"), 0.0);
    }

    #[test]
    fn test_rate_accepts_history() {
        let mut history = SnapshotHistory::new(2);
        history.push(snap(0, &[("req", 0.0)]));
        history.push(snap(500, &[("req", 1.0)]));
        history.push(snap(1_000, &[("req", 3.0)]));

        assert_eq!(calculate_rate(&history, "req"), 4.0);
    }

    #[test]
    fn test_rate_over_window() {
        let history = vec![
            snap(0, &[("req", 0.0)]),
            snap(5_000, &[("req", 10.0)]),
            snap(8_000, &[("req", 40.0)]),
            snap(10_000, &[("req", 50.0)]),
        ];

        // Window reaches back to 5s: (50 - 10) / 5
        assert_eq!(calculate_rate_over_window(&history, "req", Duration::from_secs(5)), 8.0);
        // Window covers everything: 50 / 10
        assert_eq!(calculate_rate_over_window(&history, "req", Duration::from_secs(60)), 5.0);
        // Window holds only the newest point
        assert_eq!(calculate_rate_over_window(&history, "req", Duration::from_secs(1)), 0.0);
    }

    #[test]
    fn test_rate_over_unbounded_window_covers_full_history() {
        let t0 = 1_700_000_000_000;
        let history = vec![snap(t0, &[("req", 0.0)]), snap(t0 + 10_000, &[("req", 50.0)])];

        let all = calculate_rate_over_window(&history, "req", Duration::from_secs(60));
        assert_eq!(all, 5.0);
        assert_eq!(calculate_rate_over_window(&history, "req", Duration::MAX), all);
        assert_eq!(calculate_rate_over_window(&history, "req", Duration::from_secs(u64::MAX)), all);
    }

    #[test]
    fn test_error_percentage() {
        let s = snap(0, &[("errors", 5.0), ("total", 20.0)]);
        assert_eq!(calculate_error_percentage(&s, "errors", "total"), 25.0);
    }

    #[test]
    fn test_error_percentage_zero_total() {
        let s = snap(0, &[("errors", 5.0), ("total", 0.0)]);
        let pct = calculate_error_percentage(&s, "errors", "total");
        assert_eq!(pct, 0.0);
        assert!(!pct.is_nan());

        let missing = snap(0, &[]);
        assert_eq!(calculate_error_percentage(&missing, "errors", "total"), 0.0);
    }

    #[test]
    fn test_error_percentage_by_status() {
        let s = snap(
            0,
            &[
                ("llm.calls{provider=\"a\",status=\"error\"}", 1.0),
                ("llm.calls{provider=\"a\",status=\"success\"}", 2.0),
                ("llm.calls{provider=\"b\",status=\"success\"}", 5.0),
                ("llm.calls_other{status=\"error\"}", 100.0),
            ],
        );
        assert_eq!(error_percentage_by_status(&s, "llm.calls"), 12.5);
        assert_eq!(error_percentage_by_status(&s, "nothing"), 0.0);
    }

    #[test]
    fn test_sparkline_takes_latest_in_order() {
        let history: Vec<Snapshot> = (0..6).map(|i| snap(i * 1_000, &[("c", i as f64)])).collect();

        assert_eq!(sparkline_data(&history, "c", 3), vec![3.0, 4.0, 5.0]);
        assert_eq!(sparkline_data(&history, "c", 100).len(), 6);
        assert!(sparkline_data(&history, "c", 0).is_empty());
    }

    #[test]
    fn test_sparkline_substitutes_zero() {
        let mut with_gauge = Snapshot::empty(Timestamp::from_millis(2_000));
        with_gauge.gauges.insert("g".into(), 7.0);
        let mut with_hist = Snapshot::empty(Timestamp::from_millis(3_000));
        with_hist.histograms.insert(
            "g".into(),
            HistogramStats { count: 1, avg_ms: 250.0, p50: 0.25, p95: 0.25, p99: 0.25 },
        );
        let history = vec![snap(1_000, &[]), with_gauge, with_hist];

        assert_eq!(sparkline_data(&history, "g", 10), vec![0.0, 7.0, 250.0]);
    }

    #[test]
    fn test_sparkline_with_system_field() {
        let history: Vec<Snapshot> = (0..3)
            .map(|i| {
                let mut s = snap(i * 1_000, &[]);
                s.system.cpu_percent = 10.0 * i as f64;
                s
            })
            .collect();

        assert_eq!(sparkline_with(&history, 2, |s| s.system.cpu_percent), vec![10.0, 20.0]);
    }
}
