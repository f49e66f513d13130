//! Prometheus metrics for authnet-service.

use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder};

/// Outbound gateway call counter by operation and outcome.
pub static GATEWAY_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "authnet_gateway_requests_total",
        "Total number of outbound Authorize.Net calls",
        &["operation", "outcome"] // ok, transport_error, decode_error, rejected
    )
    .expect("Failed to register gateway_requests_total")
});

/// Outbound gateway call duration histogram by operation.
pub static GATEWAY_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "authnet_gateway_request_duration_seconds",
        "Outbound Authorize.Net call duration in seconds",
        &["operation"],
        vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .expect("Failed to register gateway_request_duration")
});

/// Transaction counter by kind and outcome.
pub static TRANSACTIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "authnet_transactions_total",
        "Total number of transactions submitted",
        &["kind", "outcome"] // ok, error
    )
    .expect("Failed to register transactions_total")
});

/// Capture write-back counter for alerting; `failed` means money moved
/// but the order record is stale.
pub static CAPTURES_RECONCILED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "authnet_captures_reconciled_total",
        "Capture reconciliation writes by outcome",
        &["outcome"] // recorded, failed
    )
    .expect("Failed to register captures_reconciled_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "authnet_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&GATEWAY_REQUESTS_TOTAL);
    Lazy::force(&GATEWAY_REQUEST_DURATION);
    Lazy::force(&TRANSACTIONS_TOTAL);
    Lazy::force(&CAPTURES_RECONCILED_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_else(|e| format!("# Failed to encode metrics: {e}\n"))
}
