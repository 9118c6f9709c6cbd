//! Prometheus counters for the dispatch path.

use anyhow::Result;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Dispatch metrics kept in a private registry.
pub struct DispatchMetrics {
    registry: Registry,
    classifications: IntCounterVec,
    dispatches: IntCounterVec,
    summaries: IntCounterVec,
    dispatch_duration: HistogramVec,
}

impl DispatchMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new_custom(Some("cloudpilot".to_string()), None)?;

        let classifications = IntCounterVec::new(
            Opts::new("classifications_total", "Queries classified, by intent and method"),
            &["intent", "method"],
        )?;
        let dispatches = IntCounterVec::new(
            Opts::new("dispatches_total", "Dispatched queries, by intent and outcome"),
            &["intent", "outcome"],
        )?;
        let summaries = IntCounterVec::new(
            Opts::new("summaries_total", "Response summaries, by source"),
            &["source"],
        )?;
        let dispatch_duration = HistogramVec::new(
            HistogramOpts::new(
                "dispatch_duration_seconds",
                "End-to-end query handling time",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
            &["intent"],
        )?;

        registry.register(Box::new(classifications.clone()))?;
        registry.register(Box::new(dispatches.clone()))?;
        registry.register(Box::new(summaries.clone()))?;
        registry.register(Box::new(dispatch_duration.clone()))?;

        Ok(Self {
            registry,
            classifications,
            dispatches,
            summaries,
            dispatch_duration,
        })
    }

    pub fn record_classification(&self, intent: &str, method: &str) {
        self.classifications.with_label_values(&[intent, method]).inc();
    }

    pub fn record_dispatch(&self, intent: &str, outcome: &str, elapsed: Duration) {
        self.dispatches.with_label_values(&[intent, outcome]).inc();
        self.dispatch_duration
            .with_label_values(&[intent])
            .observe(elapsed.as_secs_f64());
    }

    pub fn record_summary(&self, source: &str) {
        self.summaries.with_label_values(&[source]).inc();
    }

    /// Text exposition format.
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(error) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(%error, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
