//! Human and machine renderings of snapshots for the CLI.

use std::fmt::Write as _;

use crate::error::MetricsResult;
use crate::snapshot::Snapshot;

const SPARK_CHARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Pretty-printed JSON, camelCase field names.
pub fn render_json(snapshot: &Snapshot) -> MetricsResult<String> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

/// Plain-text table of every series and the system record.
pub fn render_text(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_text(&mut out, snapshot);
    out
}

fn write_text(out: &mut String, snapshot: &Snapshot) -> std::fmt::Result {
    writeln!(out, "Snapshot at {}", snapshot.timestamp)?;
    writeln!(out, "{}", "=".repeat(60))?;

    if !snapshot.counters.is_empty() {
        writeln!(out, "Counters:")?;
        for (key, value) in &snapshot.counters {
            writeln!(out, "  {:<44} {:>12.2}", key, value)?;
        }
    }

    if !snapshot.gauges.is_empty() {
        writeln!(out, "Gauges:")?;
        for (key, value) in &snapshot.gauges {
            writeln!(out, "  {:<44} {:>12.2}", key, value)?;
        }
    }

    if !snapshot.histograms.is_empty() {
        writeln!(out, "Histograms:")?;
        for (key, stats) in &snapshot.histograms {
            writeln!(
                out,
                "  {}  count={} avg={:.1}ms p50={}s p95={}s p99={}s",
                key, stats.count, stats.avg_ms, stats.p50, stats.p95, stats.p99
            )?;
        }
    }

    let system = &snapshot.system;
    writeln!(out, "System:")?;
    writeln!(out, "  cpu            {:>10.1} %", system.cpu_percent)?;
    writeln!(
        out,
        "  memory         {:>10} / {} MiB ({:.1} %)",
        system.memory_used_bytes / (1024 * 1024),
        system.memory_total_bytes / (1024 * 1024),
        system.memory_percent()
    )?;
    writeln!(out, "  app memory     {:>10} MiB", system.app_memory_used_bytes / (1024 * 1024))?;
    writeln!(out, "  heap used      {:>10} MiB", system.heap_used_bytes / (1024 * 1024))?;
    writeln!(out, "  loop lag       {:>10.2} ms", system.event_loop_lag_ms)?;

    Ok(())
}

/// Unicode block sparkline scaled between the minimum and maximum points.
/// A flat series renders at the lowest level.
pub fn render_sparkline(points: &[f64]) -> String {
    let (min, max) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    let span = max - min;

    points
        .iter()
        .map(|v| {
            if span <= 0.0 || !span.is_finite() {
                SPARK_CHARS[0]
            } else {
                let level = ((v - min) / span * (SPARK_CHARS.len() - 1) as f64).round() as usize;
                SPARK_CHARS[level.min(SPARK_CHARS.len() - 1)]
            }
        })
        .collect()
}
