//! Prometheus exposition of engine metrics

mod common;

use common::*;
use llm_log_insights::metrics::{self, gather_metrics, OPERATIONS_TOTAL};
use llm_log_insights::search::FilterSpec;

#[tokio::test]
async fn test_operations_are_counted_by_outcome() {
    metrics::init_metrics().unwrap();
    let (service, _factory) = create_test_service(FakeStore::replying(hits_response(&[])));

    let success = OPERATIONS_TOTAL.with_label_values(&["search_exceptions", "success"]);
    let denied = OPERATIONS_TOTAL.with_label_values(&["search_logs", "NOT_PERMITTED"]);
    let (success_before, denied_before) = (success.get(), denied.get());

    service
        .search_exceptions("alpha", &FilterSpec::new())
        .await
        .unwrap();
    assert!(service.search_logs("beta", &FilterSpec::new()).await.is_err());

    assert!(success.get() >= success_before + 1.0);
    assert!(denied.get() >= denied_before + 1.0);
}

#[tokio::test]
async fn test_exposition_format() {
    metrics::init_metrics().unwrap();
    let (service, _factory) = create_test_service(FakeStore::new(|_| Err(unavailable())));

    let spec = FilterSpec::new().with_text_query("Connection refused by upstream");
    service.search_exceptions("alpha", &spec).await.unwrap();

    let output = gather_metrics();
    assert!(output.contains("# TYPE llm_log_insights_operations_total counter"));
    assert!(output.contains("# TYPE llm_log_insights_operation_duration_seconds histogram"));
    assert!(output.contains("llm_log_insights_store_connections_created_total"));
    assert!(output.contains("llm_log_insights_smart_search_strategy_failures_total{strategy=\"exact_phrase\"}"));
}
