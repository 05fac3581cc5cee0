//! Metrics and logging.

pub mod logging;
pub mod metrics;

pub use metrics::{MemorySink, MetricsSink, NoopSink, ScalarEvent};
