use lazy_static::lazy_static;
use prometheus::{
    Histogram, IntCounter, IntCounterVec, IntGauge, register_histogram, register_int_counter,
    register_int_counter_vec, register_int_gauge,
};


lazy_static! {
    pub static ref REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "crewgate_requests_total",
        "Rate limited requests seen, by endpoint preset",
        &["endpoint"]
    )
    .unwrap();
    pub static ref RATE_LIMITED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "crewgate_rate_limited_total",
        "Requests rejected with 429, by endpoint preset",
        &["endpoint"]
    )
    .unwrap();
    pub static ref RATE_LIMIT_KEYS: IntGauge =
        register_int_gauge!("crewgate_rate_limit_keys", "Keys currently tracked by the limiter").unwrap();
    pub static ref SWEPT_ENTRIES: IntCounter =
        register_int_counter!("crewgate_swept_entries_total", "Expired limiter entries removed").unwrap();
    pub static ref UPSTREAM_ERRORS: IntCounter =
        register_int_counter!("crewgate_upstream_errors_total", "Failed upstream requests").unwrap();
    pub static ref UPSTREAM_LATENCY: Histogram = register_histogram!(
        "crewgate_upstream_latency_seconds",
        "Upstream round trip latency in seconds"
    )
    .unwrap();
}
