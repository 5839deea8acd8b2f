//! Metrics collection and exposition.
//!
//! # Metrics
//! - `router_matches_total` (counter): match attempts by method and outcome
//! - `router_compilations_total` (counter): table builds by source (fresh, cache)
//! - `router_routes` (gauge): routes in the compiled table
//! - `router_cache_errors_total` (counter): cache failures by operation
//!
//! # Design Decisions
//! - Recording without an installed recorder is a no-op, so the library
//!   records unconditionally
//! - The Prometheus listener is only installed by the server binary

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::routing::HTTP_METHODS;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_match(method: &str, outcome: &'static str) {
    metrics::counter!("router_matches_total", "method" => method_label(method), "outcome" => outcome)
        .increment(1);
}

/// Bounded label set: extension methods collapse into `OTHER`.
fn method_label(method: &str) -> &'static str {
    HTTP_METHODS
        .iter()
        .find(|known| known.eq_ignore_ascii_case(method))
        .copied()
        .unwrap_or("OTHER")
}

pub fn record_compilation(source: &'static str, routes: usize) {
    metrics::counter!("router_compilations_total", "source" => source).increment(1);
    metrics::gauge!("router_routes").set(routes as f64);
}

pub fn record_cache_error(operation: &'static str) {
    metrics::counter!("router_cache_errors_total", "operation" => operation).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_label_is_bounded() {
        assert_eq!(method_label("GET"), "GET");
        assert_eq!(method_label("options"), "OPTIONS");
        assert_eq!(method_label("PROPFIND"), "OTHER");
        assert_eq!(method_label("X-RANDOM-1234"), "OTHER");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_match("BREW", "miss");
        record_compilation("fresh", 3);
        record_cache_error("get");
    }
}
