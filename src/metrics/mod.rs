//! Prometheus metrics for the query engine.
//!
//! Metrics live in a process-wide registry and are registered by
//! [`init_metrics`]. Recording works before registration; the values simply
//! do not show up in [`gather_metrics`] until the collectors are registered.
//!
//! # Example
//! ```no_run
//! use llm_log_insights::metrics::{self, OPERATIONS_TOTAL};
//!
//! metrics::init_metrics().ok();
//! OPERATIONS_TOTAL
//!     .with_label_values(&["search_exceptions", "success"])
//!     .inc();
//! println!("{}", metrics::gather_metrics());
//! ```

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, HistogramOpts, HistogramVec, Opts, Registry};
use std::time::Duration;

const NAMESPACE: &str = "llm_log_insights";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    /// Engine operations by outcome
    ///
    /// Labels: operation, outcome (success or the error code)
    pub static ref OPERATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("operations_total", "Total number of engine operations")
            .namespace(NAMESPACE),
        &["operation", "outcome"]
    ).expect("Failed to create OPERATIONS_TOTAL metric");

    /// Engine operation duration in seconds, store round trips included
    ///
    /// Labels: operation
    pub static ref OPERATION_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "operation_duration_seconds",
            "Engine operation duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["operation"]
    ).expect("Failed to create OPERATION_DURATION_SECONDS metric");

    /// Store client handles created by the connection cache
    pub static ref STORE_CONNECTIONS_CREATED_TOTAL: Counter = Counter::with_opts(
        Opts::new(
            "store_connections_created_total",
            "Total number of store client handles created"
        )
        .namespace(NAMESPACE)
    ).expect("Failed to create STORE_CONNECTIONS_CREATED_TOTAL metric");

    /// Smart search strategies that failed and contributed no results
    ///
    /// Labels: strategy
    pub static ref SMART_SEARCH_STRATEGY_FAILURES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            "smart_search_strategy_failures_total",
            "Total number of failed smart search strategies"
        )
        .namespace(NAMESPACE),
        &["strategy"]
    ).expect("Failed to create SMART_SEARCH_STRATEGY_FAILURES_TOTAL metric");
}

/// Register every collector with [`PROMETHEUS_REGISTRY`].
///
/// Calling this more than once is harmless.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    register(Box::new(OPERATIONS_TOTAL.clone()))?;
    register(Box::new(OPERATION_DURATION_SECONDS.clone()))?;
    register(Box::new(STORE_CONNECTIONS_CREATED_TOTAL.clone()))?;
    register(Box::new(SMART_SEARCH_STRATEGY_FAILURES_TOTAL.clone()))?;

    tracing::debug!("Prometheus metrics initialized");
    Ok(())
}

fn register(collector: Box<dyn prometheus::core::Collector>) -> Result<(), prometheus::Error> {
    match PROMETHEUS_REGISTRY.register(collector) {
        Ok(()) | Err(prometheus::Error::AlreadyReg) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Record the outcome and latency of one engine operation
pub fn record_operation(operation: &str, outcome: &str, elapsed: Duration) {
    OPERATIONS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
    OPERATION_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(elapsed.as_secs_f64());
}

/// Render the registry in the Prometheus text exposition format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        assert!(init_metrics().is_ok());
        assert!(init_metrics().is_ok());
    }

    #[test]
    fn test_record_operation() {
        record_operation("exception_trends", "success", Duration::from_millis(12));

        let value = OPERATIONS_TOTAL
            .with_label_values(&["exception_trends", "success"])
            .get();
        assert!(value >= 1.0);
    }

    #[test]
    fn test_gather_metrics() {
        init_metrics().unwrap();
        STORE_CONNECTIONS_CREATED_TOTAL.inc();

        let metrics = gather_metrics();
        assert!(metrics.contains("llm_log_insights_store_connections_created_total"));
    }
}
