//! Scalar metrics collection.
//!
//! The training loop only needs somewhere to write `(tag, value, step)`
//! events; a real experiment tracker, a file, or nothing at all can sit
//! behind the sink.

use serde::{Deserialize, Serialize};
use std::sync::RwLock;

use crate::core::{now, Timestamp};

/// One recorded scalar observation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScalarEvent {
    /// Event tag, e.g. `train/loss`
    pub tag: String,
    /// Observed value
    pub value: f64,
    /// Step (round) index
    pub step: usize,
    /// Recording timestamp
    pub timestamp: Timestamp,
}

/// Accepts scalar event writes from the training loop.
pub trait MetricsSink {
    /// Record one scalar observation.
    fn scalar(&self, tag: &str, value: f64, step: usize);
}

/// A sink that drops every event.
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn scalar(&self, _tag: &str, _value: f64, _step: usize) {}
}

/// A sink that keeps every event in memory for later inspection.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: RwLock<Vec<ScalarEvent>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events in write order.
    pub fn events(&self) -> Vec<ScalarEvent> {
        self.events.read().unwrap().clone()
    }

    /// Values recorded under `tag`, in step order of arrival.
    pub fn values_for(&self, tag: &str) -> Vec<f64> {
        self.events
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.tag == tag)
            .map(|e| e.value)
            .collect()
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.read().unwrap().len()
    }

    /// Whether no events were recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MetricsSink for MemorySink {
    fn scalar(&self, tag: &str, value: f64, step: usize) {
        let mut events = self.events.write().unwrap();
        events.push(ScalarEvent {
            tag: tag.to_string(),
            value,
            step,
            timestamp: now(),
        });
    }
}
