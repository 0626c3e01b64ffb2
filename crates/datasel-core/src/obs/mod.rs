//! Observability: runtime telemetry (metrics) and sink abstractions.
//!
//! Composition and execution report through `MetricsEvent`; structured log
//! lines go through `tracing` at the call sites.

pub(crate) mod metrics;
pub(crate) mod sink;


// re-exports
pub use metrics::{EntityCounters, EntitySummary, EventOps, EventReport, EventState};
pub use sink::{MetricsEvent, MetricsSink, metrics_report, metrics_reset_all};
