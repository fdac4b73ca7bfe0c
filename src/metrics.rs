/// Metrics and telemetry for Folio
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - HTTP request counts and latencies
/// - Report intake and review transitions
/// - Audit records written
/// - Best-effort moderation side effects that failed
/// - Notification email deliveries

use crate::error::{AppError, AppResult};
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "folio_http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "folio_http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    /// Active HTTP requests
    pub static ref HTTP_REQUESTS_ACTIVE: IntGauge = register_int_gauge!(
        "folio_http_requests_active",
        "Number of HTTP requests currently being processed"
    )
    .unwrap();

    // ========== Moderation Metrics ==========

    /// Reports submitted by reason
    pub static ref REPORTS_SUBMITTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "folio_reports_submitted_total",
        "Total number of reports submitted",
        &["reason"]
    )
    .unwrap();

    /// Report transitions by resulting status
    pub static ref REPORT_TRANSITIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "folio_report_transitions_total",
        "Total number of report status transitions",
        &["status"]
    )
    .unwrap();

    /// Audit records written by action
    pub static ref AUDIT_RECORDS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "folio_audit_records_total",
        "Total number of audit records written",
        &["action"]
    )
    .unwrap();

    /// Side effects that failed after the report was committed
    pub static ref SIDE_EFFECT_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "folio_moderation_side_effect_failures_total",
        "Total number of moderation side effects that failed",
        &["action"]
    )
    .unwrap();

    // ========== Email Metrics ==========

    /// Email delivery attempts by strategy and outcome
    pub static ref EMAIL_DELIVERIES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "folio_email_deliveries_total",
        "Total number of email delivery attempts",
        &["strategy", "outcome"]
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> AppResult<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| AppError::Internal(format!("Failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| AppError::Internal(format!("Metrics are not UTF-8: {}", e)))
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration);
}

/// Record a submitted report
pub fn record_report_submitted(reason: &str) {
    REPORTS_SUBMITTED_TOTAL.with_label_values(&[reason]).inc();
}

/// Record a committed report transition
pub fn record_report_transition(status: &str) {
    REPORT_TRANSITIONS_TOTAL.with_label_values(&[status]).inc();
}

/// Record a failed best-effort side effect
pub fn record_side_effect_failure(action: &str) {
    SIDE_EFFECT_FAILURES_TOTAL.with_label_values(&[action]).inc();
}

/// Record one email delivery attempt
pub fn record_email_delivery(strategy: &str, success: bool) {
    EMAIL_DELIVERIES_TOTAL
        .with_label_values(&[strategy, if success { "success" } else { "failure" }])
        .inc();
}
