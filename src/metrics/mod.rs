//! Prometheus metrics module
//!
//! Counters for the harvester → outlet → sink pipeline. The metric macros
//! write to the global recorder; without an installed recorder they are no-ops,
//! which is what [`OutletMetrics::detached`] relies on.

use ::metrics::{counter, describe_counter, describe_gauge, gauge, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;

use crate::error::OutletError;

/// Outlet metrics collector
#[derive(Clone)]
pub struct OutletMetrics {
    handle: Option<Arc<PrometheusHandle>>,
}

impl OutletMetrics {
    /// Install the Prometheus recorder and register metric descriptions
    pub fn install() -> Result<Self, OutletError> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| OutletError::Metrics(e.to_string()))?;

        Self::register_metrics();

        Ok(Self {
            handle: Some(Arc::new(handle)),
        })
    }

    /// Metrics that record into whatever global recorder exists (none in tests)
    pub fn detached() -> Self {
        Self { handle: None }
    }

    fn register_metrics() {
        describe_counter!(
            "outlet_events_published_total",
            Unit::Count,
            "Events accepted by the outlet with no close observed"
        );
        describe_counter!(
            "outlet_events_refused_total",
            Unit::Count,
            "Publishes that returned false (rejected or uncertain)"
        );
        describe_counter!(
            "outlet_events_acked_total",
            Unit::Count,
            "Events acknowledged by the sink"
        );
        describe_counter!(
            "outlet_events_dropped_total",
            Unit::Count,
            "Events dropped by the sink"
        );
        describe_counter!(
            "outlet_errors_total",
            Unit::Count,
            "Total outlet errors"
        );
        describe_gauge!(
            "outlet_events_pending",
            Unit::Count,
            "Events handed to the sink and not yet acked or dropped"
        );
        describe_gauge!(
            "outlet_open",
            Unit::Count,
            "Outlet state (1=open, 0=closed)"
        );
    }

    /// Record a publish that returned true
    pub fn record_published(&self, source: &str) {
        counter!("outlet_events_published_total", "source" => source.to_string()).increment(1);
    }

    /// Record a publish that returned false
    pub fn record_refused(&self, source: &str) {
        counter!("outlet_events_refused_total", "source" => source.to_string()).increment(1);
    }

    pub fn record_acked(&self) {
        counter!("outlet_events_acked_total").increment(1);
    }

    pub fn record_dropped(&self, reason: &'static str) {
        counter!("outlet_events_dropped_total", "reason" => reason).increment(1);
    }

    pub fn record_error(&self, error: &OutletError) {
        counter!("outlet_errors_total", "error_type" => error.error_type_label()).increment(1);
    }

    pub fn set_pending(&self, pending: i64) {
        gauge!("outlet_events_pending").set(pending as f64);
    }

    pub fn set_open(&self, open: bool) {
        gauge!("outlet_open").set(if open { 1.0 } else { 0.0 });
    }

    /// Render metrics in Prometheus format
    pub fn render(&self) -> String {
        self.handle
            .as_ref()
            .map(|handle| handle.render())
            .unwrap_or_default()
    }
}
