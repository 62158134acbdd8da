//! Histogram timers.

use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use compact_str::CompactString;
use quanta::Instant;
use tracing::trace;

use crate::registry::MetricsRegistry;

/// Measures one operation and records it into a histogram on [`end`].
///
/// The series key is resolved when the timer starts. Ending twice records
/// once; dropping without ending records nothing.
///
/// `R` is how the timer reaches its registry: a borrow from
/// [`MetricsRegistry::start_timer`], or an `Arc` from
/// [`MetricsRegistry::start_owned_timer`] for timers that move into spawned
/// tasks.
///
/// [`end`]: TimerHandle::end
#[must_use = "a timer records nothing until `end()` is called"]
pub struct TimerHandle<R: Deref<Target = MetricsRegistry>> {
    registry: R,
    series: CompactString,
    start: Instant,
    ended: bool,
}

/// Timer holding a shared registry handle. `Send + 'static`.
pub type OwnedTimerHandle = TimerHandle<Arc<MetricsRegistry>>;

impl<R: Deref<Target = MetricsRegistry>> TimerHandle<R> {
    pub(crate) fn new(registry: R, series: CompactString, start: Instant) -> Self {
        Self {
            registry,
            series,
            start,
            ended: false,
        }
    }

    /// Series key the observation will be recorded under.
    pub fn series(&self) -> &str {
        &self.series
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Stop the timer and record the elapsed seconds. Returns the elapsed
    /// time on the first call and `None` afterwards.
    pub fn end(&mut self) -> Option<Duration> {
        if self.ended {
            trace!(target: "metrics_collector::timer", series = %self.series, "Timer already ended");
            return None;
        }
        self.ended = true;

        let elapsed = self.registry.clock_now().duration_since(self.start);
        self.registry
            .observe_series(self.series.clone(), elapsed.as_secs_f64());
        Some(elapsed)
    }
}

impl<R: Deref<Target = MetricsRegistry>> Drop for TimerHandle<R> {
    fn drop(&mut self) {
        if !self.ended {
            trace!(target: "metrics_collector::timer", series = %self.series, "Timer dropped without end");
        }
    }
}

impl<R: Deref<Target = MetricsRegistry>> std::fmt::Debug for TimerHandle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerHandle")
            .field("series", &self.series)
            .field("ended", &self.ended)
            .finish()
    }
}
