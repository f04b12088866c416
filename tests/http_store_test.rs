//! Service end to end against a mocked search cluster over HTTP

use llm_log_insights::config::EngineConfig;
use llm_log_insights::error::AppError;
use llm_log_insights::search::FilterSpec;
use llm_log_insights::service::InsightService;
use llm_log_insights::store::StoreError;
use llm_log_insights::tenants::{Credentials, EnvironmentConfig, IndexPatterns, TenantConfig, TenantRegistry};
use mockito::Matcher;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

fn create_test_service(endpoint: &str) -> InsightService {
    let tenant = TenantConfig::new(
        "alpha",
        "Alpha Team",
        IndexPatterns {
            exceptions: vec!["exceptions-*".to_string()],
            applications: vec!["app-*".to_string()],
            logs: None,
        },
    )
    .with_environment(
        "production",
        EnvironmentConfig::new(endpoint)
            .with_credentials(Credentials::ApiKey("k3y".to_string()))
            .with_max_retries(0),
    )
    .with_default_environment("production");

    let mut configs = BTreeMap::new();
    configs.insert("alpha".to_string(), tenant);
    let registry = TenantRegistry::from_configs(configs).unwrap();
    InsightService::new(Arc::new(registry), EngineConfig::default())
}

#[tokio::test]
async fn test_exception_search_over_http() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/exceptions-*/_search")
        .match_query(Matcher::Any)
        .match_header("authorization", "ApiKey k3y")
        .match_body(Matcher::PartialJson(json!({ "size": 20, "track_total_hits": true })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "took": 4,
                "hits": {
                    "total": { "value": 311, "relation": "eq" },
                    "hits": [{
                        "_index": "exceptions-2024.03.10",
                        "_id": "abc",
                        "_source": {
                            "@timestamp": "2024-03-10T11:00:00.123Z",
                            "error": { "message": "Card processor unavailable" },
                            "service.name": "payment",
                            "environment": "production"
                        }
                    }]
                }
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let service = create_test_service(&server.url());
    let response = service
        .search_exceptions("alpha", &FilterSpec::new())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(response.data.total_hits, 311);
    let record = &response.data.records[0];
    assert_eq!(record.message, "Card processor unavailable");
    assert_eq!(record.service.as_deref(), Some("payment"));
    assert_eq!(record.environment.as_deref(), Some("production"));
    assert_eq!(record.source_index, "exceptions-2024.03.10");
}

#[tokio::test]
async fn test_cluster_error_surfaces_as_search_execution() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/exceptions-*/_search")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body("shard failure")
        .expect(1)
        .create_async()
        .await;

    let service = create_test_service(&server.url());
    let result = service
        .exception_summary("alpha", &FilterSpec::new())
        .await;

    match result {
        Err(AppError::SearchExecution {
            tenant_id,
            environment,
            operation,
            source,
        }) => {
            assert_eq!(tenant_id, "alpha");
            assert_eq!(environment, "production");
            assert_eq!(operation, "exception_summary");
            assert!(matches!(source, StoreError::Status { status: 500, .. }));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_check_connection_over_http() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/_cluster/health")
        .match_header("authorization", "ApiKey k3y")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"cluster_name": "logs-prod", "status": "yellow", "number_of_nodes": 5}"#)
        .create_async()
        .await;

    let service = create_test_service(&server.url());
    let status = service.check_connection("alpha", None).await.unwrap().data;

    assert_eq!(status.cluster_name, "logs-prod");
    assert_eq!(status.status, "yellow");
    assert_eq!(status.number_of_nodes, 5);
    assert_eq!(status.endpoint, server.url());

    service.shutdown().await;
    assert!(service.connections().is_empty());
}
