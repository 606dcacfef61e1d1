//! Prometheus counters for the proxy.

use metrics::counter;

/// Count an inbound API request by route.
pub fn record_request(route: &'static str) {
    counter!("fire_proxy_requests_total", "route" => route).increment(1);
}

/// Count a failed third-party call by upstream name.
pub fn record_upstream_failure(upstream: &'static str) {
    counter!("fire_proxy_upstream_failures_total", "upstream" => upstream).increment(1);
}

/// Count a response by its `x-cache-status` value.
pub fn record_cache_status(status: &str) {
    let status: &'static str = match status {
        "hit" => "hit",
        "stale" => "stale",
        _ => "miss",
    };
    counter!("fire_proxy_cache_total", "status" => status).increment(1);
}

pub fn record_rate_limited() {
    counter!("fire_proxy_rate_limited_total").increment(1);
}
