//! Metrics sink boundary.
//!
//! Composer and executor logic MUST NOT touch obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
use crate::obs::metrics;
use std::cell::RefCell;

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<*const dyn MetricsSink>> = RefCell::new(None);
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    ComposeStart {
        entity_path: &'static str,
    },
    ComposeFailed {
        entity_path: &'static str,
    },
    FragmentClosed {
        plugin: &'static str,
        substitutions: u64,
    },
    ExecStart {
        entity_path: &'static str,
    },
    ExecFinish {
        entity_path: &'static str,
        rows_returned: u64,
    },
    RowsScanned {
        entity_path: &'static str,
        rows_scanned: u64,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default process-local sink that writes into global metrics state.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        tracing::trace!(?event, "metrics event");

        match event {
            MetricsEvent::ComposeStart { entity_path } => metrics::with_state_mut(|m| {
                m.ops.compose_calls = m.ops.compose_calls.saturating_add(1);
                let entry = m.entities.entry(entity_path.to_string()).or_default();
                entry.compose_calls = entry.compose_calls.saturating_add(1);
            }),

            MetricsEvent::ComposeFailed { entity_path } => metrics::with_state_mut(|m| {
                m.ops.compose_failures = m.ops.compose_failures.saturating_add(1);
                let entry = m.entities.entry(entity_path.to_string()).or_default();
                entry.compose_failures = entry.compose_failures.saturating_add(1);
            }),

            MetricsEvent::FragmentClosed {
                plugin,
                substitutions,
            } => metrics::with_state_mut(|m| {
                m.ops.fragments_closed = m.ops.fragments_closed.saturating_add(1);
                m.ops.substitutions = m.ops.substitutions.saturating_add(substitutions);
                let entry = m.plugins.entry(plugin.to_string()).or_default();
                *entry = entry.saturating_add(1);
            }),

            MetricsEvent::ExecStart { entity_path } => metrics::with_state_mut(|m| {
                m.ops.exec_calls = m.ops.exec_calls.saturating_add(1);
                let entry = m.entities.entry(entity_path.to_string()).or_default();
                entry.exec_calls = entry.exec_calls.saturating_add(1);
            }),

            MetricsEvent::ExecFinish {
                entity_path,
                rows_returned,
            } => metrics::with_state_mut(|m| {
                m.ops.rows_returned = m.ops.rows_returned.saturating_add(rows_returned);
                let entry = m.entities.entry(entity_path.to_string()).or_default();
                entry.rows_returned = entry.rows_returned.saturating_add(rows_returned);
            }),

            MetricsEvent::RowsScanned {
                entity_path,
                rows_scanned,
            } => metrics::with_state_mut(|m| {
                m.ops.rows_scanned = m.ops.rows_scanned.saturating_add(rows_scanned);
                let entry = m.entities.entry(entity_path.to_string()).or_default();
                entry.rows_scanned = entry.rows_scanned.saturating_add(rows_scanned);
            }),
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    let override_ptr = SINK_OVERRIDE.with(|cell| *cell.borrow());
    if let Some(ptr) = override_ptr {
        // SAFETY:
        // - `ptr` was produced from a valid `&dyn MetricsSink` in `with_metrics_sink`,
        //   which restores the previous slot on every exit, including unwind.
        // - `record` is synchronous and never stores `ptr` beyond this call.
        // - Only a shared reference is materialized, matching the original borrow.
        unsafe { (&*ptr).record(event) };
    } else {
        GLOBAL_METRICS_SINK.record(event);
    }
}

/// Snapshot the current metrics state.
///
/// `window_start_ms` filters by window start, not by per-event timestamps.
#[must_use]
pub fn metrics_report(window_start_ms: Option<i64>) -> metrics::EventReport {
    metrics::report_window_start(window_start_ms)
}

/// Reset all metrics state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override.
pub(crate) fn with_metrics_sink<T>(sink: &dyn MetricsSink, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<*const dyn MetricsSink>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = self.0;
            });
        }
    }

    // SAFETY:
    // - The pointer is installed only for this dynamic scope; `Guard` restores
    //   the previous slot on all exits.
    // - `record` dereferences synchronously and never persists the pointer.
    let sink_ptr = unsafe { std::mem::transmute::<&dyn MetricsSink, *const dyn MetricsSink>(sink) };
    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink_ptr));
    let _guard = Guard(prev);

    f()
}

/// Span
/// RAII guard that emits start/finish metrics events for one backend call.
/// Ensures finish accounting happens even on unwind.

pub(crate) struct Span {
    entity_path: &'static str,
    rows: u64,
    finished: bool,
}

impl Span {
    #[must_use]
    pub(crate) fn new(entity_path: &'static str) -> Self {
        record(MetricsEvent::ExecStart { entity_path });

        Self {
            entity_path,
            rows: 0,
            finished: false,
        }
    }

    pub(crate) const fn set_rows(&mut self, rows: u64) {
        self.rows = rows;
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        if !self.finished {
            record(MetricsEvent::ExecFinish {
                entity_path: self.entity_path,
                rows_returned: self.rows,
            });
            self.finished = true;
        }
    }
}
