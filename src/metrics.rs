use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("chat_gateway_requests_total", "Total number of proxied API requests").unwrap();
    pub static ref RATE_LIMIT_ALLOWED: Counter =
        register_counter!("chat_gateway_rate_limit_allowed_total", "Requests admitted by the rate limiter").unwrap();
    pub static ref RATE_LIMIT_REJECTED: Counter =
        register_counter!("chat_gateway_rate_limit_rejected_total", "Requests rejected by the rate limiter").unwrap();
    pub static ref ACCESS_DENIED: Counter =
        register_counter!("chat_gateway_access_denied_total", "Requests refused by access hours or role checks").unwrap();
    pub static ref TRACKED_CLIENTS: Gauge =
        register_gauge!("chat_gateway_tracked_clients", "Client identifiers currently held by the rate limiter").unwrap();
    pub static ref UPSTREAM_LATENCY: Histogram = register_histogram!(
        "chat_gateway_upstream_latency_seconds",
        "Upstream request latency in seconds"
    )
    .unwrap();
}
