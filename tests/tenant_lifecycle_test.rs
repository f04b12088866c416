//! Governance, connection reuse, registry reloads and shutdown

mod common;

use common::*;
use llm_log_insights::error::AppError;
use llm_log_insights::search::FilterSpec;
use llm_log_insights::tenants::{Operation, TenantProvider, TenantRegistry};
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

const TENANTS_YAML: &str = r#"
alpha:
  teamName: Alpha Team
  defaultEnvironment: production
  maxSearchResults: 50
  environments:
    production:
      endpoint: http://prod:9200
      apiKey: secret-key
  indexPatterns:
    exceptions: ["exceptions-*"]
    applications: ["app-*"]
"#;

#[tokio::test]
async fn test_disallowed_operation_never_reaches_store() {
    let (service, factory) = create_test_service(FakeStore::replying(hits_response(&[])));

    let result = service.search_logs("beta", &FilterSpec::new()).await;

    match result {
        Err(AppError::NotPermitted {
            tenant_id,
            operation,
        }) => {
            assert_eq!(tenant_id, "beta");
            assert_eq!(operation, "search_logs");
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(factory.created(), 0);
    assert_eq!(factory.store.search_count(), 0);

    // the one allowed operation still works
    assert!(service
        .search_exceptions("beta", &FilterSpec::new())
        .await
        .is_ok());
}

#[tokio::test]
async fn test_every_analysis_operation_is_governed() {
    let (service, factory) = create_test_service(FakeStore::replying(hits_response(&[])));
    let spec = FilterSpec::new();

    assert!(matches!(
        service.exception_summary("beta", &spec).await,
        Err(AppError::NotPermitted { .. })
    ));
    assert!(matches!(
        service.frequent_exceptions("beta", &spec).await,
        Err(AppError::NotPermitted { .. })
    ));
    assert!(matches!(
        service.exception_trends("beta", &spec).await,
        Err(AppError::NotPermitted { .. })
    ));
    assert!(matches!(
        service.analyze_exception("beta", "boom", &spec).await,
        Err(AppError::NotPermitted { .. })
    ));
    assert!(matches!(
        service.check_connection("beta", None).await,
        Err(AppError::NotPermitted { .. })
    ));
    assert_eq!(factory.store.search_count(), 0);
}

#[tokio::test]
async fn test_concurrent_requests_share_one_connection() {
    let (service, factory) = create_test_service(FakeStore::replying(hits_response(&[])));
    let service = Arc::new(service);

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .search_exceptions("alpha", &FilterSpec::new().with_environment("production"))
                    .await
            })
        })
        .collect();

    for task in tasks {
        assert!(task.await.unwrap().is_ok());
    }

    assert_eq!(factory.created(), 1);
    assert_eq!(factory.store.search_count(), 16);
    assert!(service.connections().contains("alpha", "production"));
}

#[tokio::test]
async fn test_environments_get_separate_connections() {
    let (service, factory) = create_test_service(FakeStore::replying(hits_response(&[])));

    for environment in ["production", "staging", "production"] {
        let spec = FilterSpec::new().with_environment(environment);
        service.search_exceptions("alpha", &spec).await.unwrap();
    }

    assert_eq!(factory.created(), 2);
    assert_eq!(service.connections().len(), 2);
}

#[tokio::test]
async fn test_check_connection_reports_health() {
    let (service, _factory) = create_test_service(FakeStore::replying(hits_response(&[])));

    let response = service.check_connection("alpha", Some("staging")).await.unwrap();

    assert_eq!(response.context.environment, "staging");
    assert_eq!(response.context.operation, Operation::CheckConnection);
    assert_eq!(response.data.status, "green");
    assert_eq!(response.data.cluster_name, "fake-cluster");
    assert_eq!(response.data.number_of_nodes, 3);
}

#[tokio::test]
async fn test_shutdown_closes_cached_connections() {
    let (service, factory) = create_test_service(FakeStore::replying(hits_response(&[])));
    service
        .search_exceptions("alpha", &FilterSpec::new())
        .await
        .unwrap();
    service
        .search_exceptions("alpha", &FilterSpec::new().with_environment("staging"))
        .await
        .unwrap();

    service.shutdown().await;

    assert_eq!(factory.store.close_count(), 2);
    assert!(service.connections().is_empty());
}

#[test]
fn test_list_tenants_and_environments() {
    let (service, _factory) = create_test_service(FakeStore::replying(hits_response(&[])));

    let tenants = service.list_tenants();
    let ids: Vec<&str> = tenants.iter().map(|t| t.tenant_id.as_str()).collect();
    assert_eq!(ids, vec!["alpha", "beta"]);
    assert_eq!(tenants[0].display_name, "Alpha Team");

    let environments = service.list_environments("alpha").unwrap();
    let names: Vec<(&str, bool)> = environments
        .iter()
        .map(|e| (e.name.as_str(), e.is_default))
        .collect();
    assert_eq!(names, vec![("production", true), ("staging", false)]);

    assert!(matches!(
        service.list_environments("gamma"),
        Err(AppError::Configuration(_))
    ));
}

#[test]
fn test_registry_loads_yaml_document_from_disk() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(TENANTS_YAML.as_bytes()).unwrap();

    let registry = TenantRegistry::load(file.path()).unwrap();
    let alpha = registry.get_config("alpha").unwrap();

    assert_eq!(alpha.tenant_id, "alpha");
    assert_eq!(alpha.max_search_results, 50);
    assert!(alpha.is_permitted(Operation::SearchLogs));

    // credentials never show up in debug output
    assert!(!format!("{:?}", alpha).contains("secret-key"));
}

#[test]
fn test_reload_swaps_whole_set() {
    let (service, _factory) = create_test_service(FakeStore::replying(hits_response(&[])));
    let before = service.registry().get_config("beta").unwrap();

    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(TENANTS_YAML.as_bytes()).unwrap();
    assert_eq!(service.reload_tenants_from_file(file.path()).unwrap(), 1);

    assert!(matches!(
        service.registry().get_config("beta"),
        Err(AppError::Configuration(_))
    ));
    // snapshots taken before the reload stay usable
    assert_eq!(before.display_name, "Beta Team");

    let mut configs = BTreeMap::new();
    configs.insert("beta".to_string(), create_test_beta());
    let replacement = TenantRegistry::from_configs(configs).unwrap().snapshot();
    service.reload_tenants((*replacement).clone());
    assert_eq!(service.registry().tenant_ids(), vec!["beta".to_string()]);
}

#[test]
fn test_invalid_reload_keeps_current_set() {
    let (service, _factory) = create_test_service(FakeStore::replying(hits_response(&[])));

    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(b"alpha:\n  teamName: ''\n  environments: {}\n").unwrap();

    assert!(matches!(
        service.reload_tenants_from_file(file.path()),
        Err(AppError::Configuration(_))
    ));
    assert_eq!(service.registry().len(), 2);
}
