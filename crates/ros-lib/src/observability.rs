//! Observability for the dashboard views
//!
//! Provides:
//! - Prometheus metrics (API latency, request errors, stale responses, merge misses)
//! - Structured logging of view events with tracing

use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    HistogramVec, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Histogram buckets for API latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<RosMetricsInner> = OnceLock::new();

struct RosMetricsInner {
    request_latency_seconds: HistogramVec,
    request_errors: IntCounterVec,
    stale_responses: IntCounter,
    merge_misses: IntCounter,
    systems_total: IntGauge,
}

impl RosMetricsInner {
    fn new() -> Self {
        Self {
            request_latency_seconds: register_histogram_vec!(
                "ros_api_request_latency_seconds",
                "Latency of requests to the ROS and inventory APIs",
                &["endpoint"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register request_latency_seconds"),

            request_errors: register_int_counter_vec!(
                "ros_api_request_errors_total",
                "Requests that ended in an HTTP, network or decode error",
                &["endpoint"]
            )
            .expect("Failed to register request_errors"),

            stale_responses: register_int_counter!(
                "ros_stale_responses_discarded_total",
                "Responses dropped because a newer request superseded them"
            )
            .expect("Failed to register stale_responses"),

            merge_misses: register_int_counter!(
                "ros_inventory_merge_misses_total",
                "Systems without a matching inventory entity"
            )
            .expect("Failed to register merge_misses"),

            systems_total: register_int_gauge!(
                "ros_systems_total",
                "Total systems reported by the last committed systems fetch"
            )
            .expect("Failed to register systems_total"),
        }
    }
}

/// Handle to the process-wide metrics.
///
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct RosMetrics {
    _private: (),
}

impl Default for RosMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RosMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(RosMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &RosMetricsInner {
        GLOBAL_METRICS.get_or_init(RosMetricsInner::new)
    }

    pub fn observe_request_latency(&self, endpoint: &str, duration_secs: f64) {
        self.inner()
            .request_latency_seconds
            .with_label_values(&[endpoint])
            .observe(duration_secs);
    }

    pub fn inc_request_errors(&self, endpoint: &str) {
        self.inner()
            .request_errors
            .with_label_values(&[endpoint])
            .inc();
    }

    pub fn inc_stale_responses(&self) {
        self.inner().stale_responses.inc();
    }

    pub fn add_merge_misses(&self, misses: u64) {
        self.inner().merge_misses.inc_by(misses);
    }

    pub fn set_systems_total(&self, total: i64) {
        self.inner().systems_total.set(total);
    }
}

/// Structured logger for view events
#[derive(Clone)]
pub struct StructuredLogger {
    view: String,
}

impl StructuredLogger {
    pub fn new(view: impl Into<String>) -> Self {
        Self { view: view.into() }
    }

    /// Log a committed systems page
    pub fn log_systems_fetched(
        &self,
        generation: u64,
        page: u32,
        per_page: u32,
        returned: usize,
        total: u64,
        merge_misses: usize,
    ) {
        info!(
            event = "systems_fetched",
            view = %self.view,
            generation = generation,
            page = page,
            per_page = per_page,
            returned = returned,
            total = total,
            merge_misses = merge_misses,
            "Fetched systems page"
        );
    }

    /// Log a committed recommendations page
    pub fn log_recommendations_fetched(
        &self,
        generation: u64,
        inventory_id: &str,
        page: u32,
        returned: usize,
        total: u64,
    ) {
        info!(
            event = "recommendations_fetched",
            view = %self.view,
            generation = generation,
            inventory_id = %inventory_id,
            page = page,
            returned = returned,
            total = total,
            "Fetched system recommendations"
        );
    }

    /// Log a response that lost the race against a newer request
    pub fn log_stale_response(&self, kind: &str, generation: u64, latest: u64) {
        debug!(
            event = "stale_response_discarded",
            view = %self.view,
            kind = %kind,
            generation = generation,
            latest_generation = latest,
            "Discarded response superseded by a newer request"
        );
    }

    /// Log a failed fetch
    pub fn log_fetch_failed(&self, kind: &str, generation: u64, error: &str) {
        warn!(
            event = "fetch_failed",
            view = %self.view,
            kind = %kind,
            generation = generation,
            error = %error,
            "Fetch failed"
        );
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str, api_url: &str) {
        info!(
            event = "dashboard_started",
            view = %self.view,
            version = %version,
            api_url = %api_url,
            "Resource optimization dashboard started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "dashboard_shutdown",
            view = %self.view,
            reason = %reason,
            "Resource optimization dashboard shutting down"
        );
    }
}
