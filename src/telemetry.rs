//! Observability handle
//!
//! Components receive a `Telemetry` at construction and emit counters and
//! structured events through it. Emission is fire-and-forget: a disabled
//! handle drops everything and must never change what a component returns.

use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum MetricUnit {
    Count,
    Seconds,
    Percent,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Metric {
    pub name: String,
    pub unit: MetricUnit,
    pub value: f64,
}

/// Destination for metrics and events
pub trait TelemetrySink: Send + Sync {
    fn emit_metric(&self, metric: Metric);
    fn emit_event(&self, name: &str, fields: Value);
}

/// Shared, cheaply clonable handle. Created once per process.
#[derive(Clone, Default)]
pub struct Telemetry {
    sink: Option<Arc<dyn TelemetrySink>>,
}

impl Telemetry {
    pub fn new(sink: Arc<dyn TelemetrySink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// Forward everything to `tracing`
    pub fn tracing() -> Self {
        Self::new(Arc::new(TracingSink))
    }

    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn metric(&self, name: &str, unit: MetricUnit, value: f64) {
        if let Some(sink) = &self.sink {
            sink.emit_metric(Metric {
                name: name.to_string(),
                unit,
                value,
            });
        }
    }

    pub fn count(&self, name: &str) {
        self.metric(name, MetricUnit::Count, 1.0);
    }

    pub fn event(&self, name: &str, fields: Value) {
        if let Some(sink) = &self.sink {
            sink.emit_event(name, fields);
        }
    }
}

impl std::fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Telemetry")
            .field("enabled", &self.sink.is_some())
            .finish()
    }
}

/// Sink that writes metrics and events as `tracing` records
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn emit_metric(&self, metric: Metric) {
        info!(
            target: "telemetry",
            metric = %metric.name,
            unit = ?metric.unit,
            value = metric.value,
            "metric"
        );
    }

    fn emit_event(&self, name: &str, fields: Value) {
        info!(target: "telemetry", event = name, fields = %fields, "event");
    }
}

/// Sink that keeps everything in memory (tests, dashboards)
#[derive(Default)]
pub struct RecordingSink {
    metrics: Mutex<Vec<Metric>>,
    events: Mutex<Vec<(String, Value)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metrics(&self) -> Vec<Metric> {
        self.metrics.lock().map(|m| m.clone()).unwrap_or_default()
    }

    pub fn events(&self) -> Vec<(String, Value)> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Sum of all values recorded under `name`
    pub fn total(&self, name: &str) -> f64 {
        self.metrics()
            .iter()
            .filter(|m| m.name == name)
            .map(|m| m.value)
            .sum()
    }
}

impl TelemetrySink for RecordingSink {
    fn emit_metric(&self, metric: Metric) {
        if let Ok(mut metrics) = self.metrics.lock() {
            metrics.push(metric);
        }
    }

    fn emit_event(&self, name: &str, fields: Value) {
        if let Ok(mut events) = self.events.lock() {
            events.push((name.to_string(), fields));
        }
    }
}
