use super::Span;
#[cfg(feature = "profiling")]
use super::TOTAL_MEASURED;
#[cfg(feature = "profiling")]
use indexmap::IndexMap;
#[cfg(feature = "profiling")]
use std::{
    sync::{Mutex, MutexGuard, OnceLock},
    time::{Duration, Instant},
};

#[cfg(feature = "profiling")]
static PROFILING_DATA: OnceLock<Mutex<ProfilingDataContainer>> = OnceLock::new();

/// Acquires an exclusive lock on the profiling data, blocking until it's available. A worker
/// that panicked while holding the lock leaves the counts usable, so poisoning is ignored.
#[cfg(feature = "profiling")]
pub(super) fn profiling_data() -> MutexGuard<'static, ProfilingDataContainer> {
    PROFILING_DATA
        .get_or_init(|| Mutex::new(ProfilingDataContainer::default()))
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(feature = "profiling")]
#[derive(Default)]
pub(super) struct ProfilingDataContainer {
    pub start_time: Option<Instant>,
    pub counts: IndexMap<&'static str, usize>,
    // Span counts live with the span durations; they are displayed together.
    pub spans: IndexMap<&'static str, (Duration, usize)>,
    // Spans currently open on any thread. `coverage` is the start of the current stretch of
    // time during which at least one span was open.
    pub open_span_count: usize,
    pub coverage: Option<Instant>,
}

#[cfg(feature = "profiling")]
impl ProfilingDataContainer {
    pub fn increment_named_count(&mut self, key: &'static str) {
        self.init_start_time();
        *self.counts.entry(key).or_insert(0) += 1;
    }

    pub fn get_named_count(&self, key: &'static str) -> Option<usize> {
        self.counts.get(&key).copied()
    }

    fn init_start_time(&mut self) {
        if self.start_time.is_none() {
            self.start_time = Some(Instant::now());
        }
    }

    fn open_span(&mut self, label: &'static str) -> Span {
        self.init_start_time();
        if self.open_span_count == 0 {
            self.coverage = Some(Instant::now());
        }
        self.open_span_count += 1;
        Span::new(label)
    }

    /// Called from `Span::drop`.
    pub(super) fn close_span(&mut self, span: &Span) {
        self.open_span_count = self.open_span_count.saturating_sub(1);
        if self.open_span_count == 0 {
            if let Some(coverage) = self.coverage.take() {
                self.record_span(TOTAL_MEASURED, coverage.elapsed());
            }
        }
        self.record_span(span.label, span.start_time.elapsed());
    }

    fn record_span(&mut self, label: &'static str, elapsed: Duration) {
        let (time, count) = self
            .spans
            .entry(label)
            .or_insert((Duration::ZERO, 0));
        *time += elapsed;
        *count += 1;
    }

    fn elapsed_seconds(&self) -> f64 {
        self.start_time
            .map_or(0.0, |start_time| start_time.elapsed().as_secs_f64())
    }

    /// Rows of ("Event Label", "Count", "Rate (per sec)").
    pub(super) fn get_named_counts_table(&self) -> Vec<(String, usize, f64)> {
        let elapsed = self.elapsed_seconds();
        self.counts
            .iter()
            .map(|(key, &count)| {
                #[allow(clippy::cast_precision_loss)]
                let rate = count as f64 / elapsed;
                ((*key).to_string(), count, rate)
            })
            .collect()
    }

    /// Rows of ("Span Label", "Count", "Duration", "% runtime"), with the total measured time
    /// last.
    pub(super) fn get_named_spans_table(&self) -> Vec<(String, usize, Duration, f64)> {
        let elapsed = self.elapsed_seconds();
        let row = |label: &str, &(duration, count): &(Duration, usize)| {
            (
                label.to_string(),
                count,
                duration,
                duration.as_secs_f64() / elapsed * 100.0,
            )
        };
        let mut rows = self
            .spans
            .iter()
            .filter(|(label, _)| **label != TOTAL_MEASURED)
            .map(|(label, value)| row(label, value))
            .collect::<Vec<_>>();
        if let Some(value) = self.spans.get(&TOTAL_MEASURED) {
            rows.push(row(TOTAL_MEASURED, value));
        }
        rows
    }
}

#[cfg(feature = "profiling")]
pub fn increment_named_count(key: &'static str) {
    profiling_data().increment_named_count(key);
}

#[cfg(not(feature = "profiling"))]
pub fn increment_named_count(_key: &'static str) {}

#[cfg(feature = "profiling")]
#[must_use]
pub fn get_named_count(key: &'static str) -> Option<usize> {
    profiling_data().get_named_count(key)
}

#[cfg(not(feature = "profiling"))]
#[must_use]
pub fn get_named_count(_key: &'static str) -> Option<usize> {
    None
}

#[cfg(feature = "profiling")]
#[must_use]
pub fn open_span(label: &'static str) -> Span {
    profiling_data().open_span(label)
}

#[cfg(not(feature = "profiling"))]
#[must_use]
pub fn open_span(label: &'static str) -> Span {
    Span::new(label)
}

/// Closes a span before the end of its scope. Equivalent to dropping it.
pub fn close_span(_span: Span) {}
