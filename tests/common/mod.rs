//! Shared fixtures for integration tests: an in-memory store that records
//! every request and replays scripted responses.

#![allow(dead_code)]

use async_trait::async_trait;
use llm_log_insights::config::EngineConfig;
use llm_log_insights::connections::{ClientFactory, ConnectionCache, ConnectionKey};
use llm_log_insights::service::InsightService;
use llm_log_insights::store::{
    ClusterHealth, RawSearchResponse, StoreClient, StoreError, StoreResult,
};
use llm_log_insights::tenants::{
    EnvironmentConfig, IndexPatterns, Operation, TenantConfig, TenantRegistry,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// How the fake store answers a search
pub type Responder = Box<dyn Fn(&Value) -> StoreResult<RawSearchResponse> + Send + Sync>;

/// One search request seen by the fake store
#[derive(Debug, Clone)]
pub struct RecordedSearch {
    pub indices: Vec<String>,
    pub body: Value,
}

/// In-memory store client driven by a responder closure
pub struct FakeStore {
    endpoint: String,
    responder: Responder,
    searches: Mutex<Vec<RecordedSearch>>,
    closed: AtomicUsize,
}

impl FakeStore {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&Value) -> StoreResult<RawSearchResponse> + Send + Sync + 'static,
    {
        Self {
            endpoint: "http://fake-store:9200".to_string(),
            responder: Box::new(responder),
            searches: Mutex::new(Vec::new()),
            closed: AtomicUsize::new(0),
        }
    }

    /// Always answer with the same response
    pub fn replying(response: Value) -> Self {
        Self::new(move |_| Ok(parse_response(&response)))
    }

    pub fn searches(&self) -> Vec<RecordedSearch> {
        self.searches.lock().clone()
    }

    pub fn search_count(&self) -> usize {
        self.searches.lock().len()
    }

    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreClient for FakeStore {
    async fn search(&self, indices: &[String], body: &Value) -> StoreResult<RawSearchResponse> {
        self.searches.lock().push(RecordedSearch {
            indices: indices.to_vec(),
            body: body.clone(),
        });
        (self.responder)(body)
    }

    async fn health(&self) -> StoreResult<ClusterHealth> {
        Ok(ClusterHealth {
            cluster_name: "fake-cluster".to_string(),
            status: "green".to_string(),
            number_of_nodes: 3,
        })
    }

    async fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Hands out one shared fake store and counts how often it was asked to
pub struct FakeFactory {
    pub store: Arc<FakeStore>,
    created: AtomicUsize,
}

impl FakeFactory {
    pub fn new(store: FakeStore) -> Self {
        Self {
            store: Arc::new(store),
            created: AtomicUsize::new(0),
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl ClientFactory for FakeFactory {
    fn create(
        &self,
        _key: &ConnectionKey,
        _environment: &EnvironmentConfig,
    ) -> StoreResult<Arc<dyn StoreClient>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(self.store.clone())
    }
}

/// Lets the test keep a handle on the factory the service uses
struct SharedFactory(Arc<FakeFactory>);

impl ClientFactory for SharedFactory {
    fn create(
        &self,
        key: &ConnectionKey,
        environment: &EnvironmentConfig,
    ) -> StoreResult<Arc<dyn StoreClient>> {
        self.0.create(key, environment)
    }
}

pub fn parse_response(value: &Value) -> RawSearchResponse {
    serde_json::from_value(value.clone()).unwrap()
}

pub fn unavailable() -> StoreError {
    StoreError::status(503, "cluster unavailable")
}

/// Search response with the given `(index, id, source)` hits
pub fn hits_response(hits: &[(&str, &str, Value)]) -> Value {
    let hits: Vec<Value> = hits
        .iter()
        .map(|(index, id, source)| json!({ "_index": index, "_id": id, "_source": source }))
        .collect();
    json!({
        "took": 3,
        "hits": { "total": { "value": hits.len(), "relation": "eq" }, "hits": hits }
    })
}

pub fn exception_doc(message: &str, service: &str) -> Value {
    json!({
        "@timestamp": "2024-03-10T11:00:00Z",
        "message": message,
        "log.level": "error",
        "service": { "name": service },
        "error": { "stack_trace": format!("{}\n  at handler", message) }
    })
}

/// "alpha": production (default) and staging, result cap 50, every operation allowed
pub fn create_test_alpha() -> TenantConfig {
    TenantConfig::new(
        "alpha",
        "Alpha Team",
        IndexPatterns {
            exceptions: vec!["exceptions-*".to_string()],
            applications: vec!["app-*".to_string()],
            logs: Some(vec!["logs-*".to_string()]),
        },
    )
    .with_environment("production", EnvironmentConfig::new("http://prod:9200"))
    .with_environment("staging", EnvironmentConfig::new("http://staging:9200"))
    .with_default_environment("production")
    .with_max_search_results(50)
}

/// "beta": may only run exception searches
pub fn create_test_beta() -> TenantConfig {
    TenantConfig::new(
        "beta",
        "Beta Team",
        IndexPatterns {
            exceptions: vec!["beta-exceptions-*".to_string()],
            applications: vec!["beta-app-*".to_string()],
            logs: None,
        },
    )
    .with_environment("production", EnvironmentConfig::new("http://beta:9200"))
    .with_default_environment("production")
    .with_allowed_operations([Operation::SearchExceptions])
}

pub fn create_test_registry() -> Arc<TenantRegistry> {
    let mut configs = BTreeMap::new();
    configs.insert("alpha".to_string(), create_test_alpha());
    configs.insert("beta".to_string(), create_test_beta());
    Arc::new(TenantRegistry::from_configs(configs).unwrap())
}

/// Service wired to a fake store; returns the factory for inspection
pub fn create_test_service(store: FakeStore) -> (InsightService, Arc<FakeFactory>) {
    create_test_service_with(store, EngineConfig::default())
}

pub fn create_test_service_with(
    store: FakeStore,
    settings: EngineConfig,
) -> (InsightService, Arc<FakeFactory>) {
    let factory = Arc::new(FakeFactory::new(store));
    let connections = ConnectionCache::with_factory(Arc::new(SharedFactory(factory.clone())));
    let service = InsightService::with_connections(create_test_registry(), connections, settings);
    (service, factory)
}

/// Text of the first `must` clause of a recorded search body
pub fn must_query(body: &Value) -> Option<String> {
    let clause = body["query"]["bool"]["must"].get(0)?;
    clause["multi_match"]["query"].as_str().map(str::to_string)
}
