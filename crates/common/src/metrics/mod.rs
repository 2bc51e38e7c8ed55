//! Metrics helpers
//!
//! Prometheus metrics with standardized naming. The gateway registers the
//! descriptions at startup and records counters on the mutation paths.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all ScholarPort metrics
pub const METRICS_PREFIX: &str = "scholarport";

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        format!("{}_articles_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total articles created"
    );

    describe_counter!(
        format!("{}_articles_deleted_total", METRICS_PREFIX),
        Unit::Count,
        "Total articles deleted (cascading their citations)"
    );

    describe_counter!(
        format!("{}_citations_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total citations created, including bulk imports"
    );

    describe_counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of search queries"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record an article creation
pub fn record_article_created() {
    counter!(format!("{}_articles_created_total", METRICS_PREFIX)).increment(1);
}

/// Record an article deletion
pub fn record_article_deleted() {
    counter!(format!("{}_articles_deleted_total", METRICS_PREFIX)).increment(1);
}

/// Record citation creations (single or bulk)
pub fn record_citations_created(count: u64, source: &'static str) {
    counter!(
        format!("{}_citations_created_total", METRICS_PREFIX),
        "source" => source
    )
    .increment(count);
}

/// Record a search query
pub fn record_search(scope: &'static str) {
    counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        "scope" => scope
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_metrics() {
        let metrics = RequestMetrics::start("GET", "/api/articles");
        metrics.finish(200);
        // Just verify it runs without panic
    }
}
