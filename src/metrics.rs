use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Gauge, Histogram, register_counter, register_counter_vec, register_gauge,
    register_histogram,
};


lazy_static! {
    pub static ref SUBMISSIONS_TOTAL: Counter =
        register_counter!("explorer_submissions_total", "Total number of prompt submissions").unwrap();
    pub static ref RATE_LIMITED_TOTAL: Counter =
        register_counter!("explorer_rate_limited_total", "Total rate limit rejections").unwrap();
    pub static ref BACKEND_ERRORS: CounterVec = register_counter_vec!(
        "explorer_backend_errors_total",
        "Failed backend streams",
        &["backend"]
    )
    .unwrap();
    pub static ref FRAGMENTS_TOTAL: Counter =
        register_counter!("explorer_fragments_total", "Total streamed text fragments").unwrap();
    pub static ref STREAM_DURATION: Histogram = register_histogram!(
        "explorer_stream_duration_seconds",
        "Backend stream duration in seconds"
    )
    .unwrap();
    pub static ref STREAMS_IN_FLIGHT: Gauge =
        register_gauge!("explorer_streams_in_flight", "Backend streams currently running").unwrap();
}
