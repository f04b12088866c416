//! Engine facade: tenant lookup, governance, connection reuse and execution

use crate::analytics::{
    AggregationSummary, AnalysisEngine, FrequencyRanking, ServiceTrendReport,
    SpecificExceptionAnalysis,
};
use crate::config::EngineConfig;
use crate::connections::{ConnectionCache, ConnectionHandle};
use crate::context::{OperationResponse, QueryContext};
use crate::error::{AppError, Result};
use crate::metrics::record_operation;
use crate::search::{
    sort_by_frequency, FilterSpec, QueryBuilder, SearchExecutor, SearchKind, SearchPage,
    SearchResultRecord, SmartSearchMerger, Strategy, TimeWindow,
};
use crate::store::redact_userinfo;
use crate::tenants::{Operation, TenantConfig, TenantProvider, TenantRegistry, TenantSet};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Default window of the aggregate analysis operations
pub fn analysis_window() -> Duration {
    Duration::days(7)
}

/// Records returned by a search operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub records: Vec<SearchResultRecord>,
    /// Store-reported total for a single-pass search; the merged record
    /// count for a smart search
    pub total_hits: u64,
    /// Whether the multi-strategy merger produced these records
    pub smart_search: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub strategies_failed: Vec<Strategy>,
}

impl From<SearchPage> for SearchResults {
    fn from(page: SearchPage) -> Self {
        Self {
            records: page.records,
            total_hits: page.total_hits,
            smart_search: false,
            strategies_failed: Vec::new(),
        }
    }
}

/// Cluster health as seen through a tenant's credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub endpoint: String,
    pub status: String,
    pub cluster_name: String,
    pub number_of_nodes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantSummary {
    pub tenant_id: String,
    pub display_name: String,
    pub default_environment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentSummary {
    pub name: String,
    pub endpoint: String,
    pub is_default: bool,
}

/// Multi-tenant exception and log query engine
pub struct InsightService {
    registry: Arc<TenantRegistry>,
    connections: ConnectionCache,
    settings: EngineConfig,
    executor: SearchExecutor,
    analysis: AnalysisEngine,
}

impl InsightService {
    /// Create a service that talks to stores over HTTP
    pub fn new(registry: Arc<TenantRegistry>, settings: EngineConfig) -> Self {
        Self::with_connections(registry, ConnectionCache::new(), settings)
    }

    pub fn with_connections(
        registry: Arc<TenantRegistry>,
        connections: ConnectionCache,
        settings: EngineConfig,
    ) -> Self {
        let analysis = AnalysisEngine::new(settings.analytics());
        Self {
            registry,
            connections,
            settings,
            executor: SearchExecutor::new(),
            analysis,
        }
    }

    pub fn registry(&self) -> &TenantRegistry {
        &self.registry
    }

    pub fn connections(&self) -> &ConnectionCache {
        &self.connections
    }

    pub fn settings(&self) -> &EngineConfig {
        &self.settings
    }

    /// Search exception indices; free text goes through smart search when enabled
    pub async fn search_exceptions(
        &self,
        tenant_id: &str,
        spec: &FilterSpec,
    ) -> Result<OperationResponse<SearchResults>> {
        let operation = Operation::SearchExceptions;
        self.observe(tenant_id, operation, async {
            let (tenant, handle) = self.prepare(tenant_id, operation, spec)?;
            let builder = QueryBuilder::new(&tenant)
                .with_default_exception_limit(self.settings.default_exception_limit);
            let ctx = QueryContext::for_handle(&handle, operation)
                .with_window(builder.window(SearchKind::Exceptions, spec));

            let mut results = if self.settings.smart_search_enabled && spec.text().is_some() {
                let outcome = SmartSearchMerger::new(&self.executor)
                    .search(&handle, &builder, spec, &ctx)
                    .await;
                SearchResults {
                    total_hits: outcome.records.len() as u64,
                    records: outcome.records,
                    smart_search: true,
                    strategies_failed: outcome.strategies_failed,
                }
            } else {
                let query = builder.build(SearchKind::Exceptions, spec);
                SearchResults::from(self.executor.execute(&handle, &query, &ctx).await?)
            };

            if spec.sort_by_frequency {
                sort_by_frequency(&mut results.records);
            }
            Ok(OperationResponse::new(ctx, results))
        })
        .await
    }

    /// Search application and log indices in a single pass
    pub async fn search_logs(
        &self,
        tenant_id: &str,
        spec: &FilterSpec,
    ) -> Result<OperationResponse<SearchResults>> {
        let operation = Operation::SearchLogs;
        self.observe(tenant_id, operation, async {
            let (tenant, handle) = self.prepare(tenant_id, operation, spec)?;
            let query = QueryBuilder::new(&tenant).build(SearchKind::Logs, spec);
            let ctx = QueryContext::for_handle(&handle, operation).with_window(query.window);

            let mut results = SearchResults::from(self.executor.execute(&handle, &query, &ctx).await?);
            if spec.sort_by_frequency {
                sort_by_frequency(&mut results.records);
            }
            Ok(OperationResponse::new(ctx, results))
        })
        .await
    }

    pub async fn exception_summary(
        &self,
        tenant_id: &str,
        spec: &FilterSpec,
    ) -> Result<OperationResponse<AggregationSummary>> {
        let operation = Operation::ExceptionSummary;
        self.observe(tenant_id, operation, async {
            let (tenant, handle, ctx, window) = self.prepare_analysis(tenant_id, operation, spec)?;
            let summary = self
                .analysis
                .summarize(&handle, &tenant.exception_indices(), &window, &ctx)
                .await?;
            Ok(OperationResponse::new(ctx, summary))
        })
        .await
    }

    /// Most frequent error messages; `limit` defaults to the engine setting and is capped by the tenant
    pub async fn frequent_exceptions(
        &self,
        tenant_id: &str,
        spec: &FilterSpec,
    ) -> Result<OperationResponse<Vec<FrequencyRanking>>> {
        let operation = Operation::FrequentExceptions;
        self.observe(tenant_id, operation, async {
            let (tenant, handle, ctx, window) = self.prepare_analysis(tenant_id, operation, spec)?;
            let limit = spec
                .limit
                .unwrap_or(self.settings.default_frequent_limit)
                .min(tenant.max_search_results);

            let rankings = self
                .analysis
                .rank_frequent(
                    &handle,
                    &tenant.exception_indices(),
                    &window,
                    limit,
                    spec.service.as_deref(),
                    &ctx,
                )
                .await?;
            Ok(OperationResponse::new(ctx, rankings))
        })
        .await
    }

    pub async fn exception_trends(
        &self,
        tenant_id: &str,
        spec: &FilterSpec,
    ) -> Result<OperationResponse<ServiceTrendReport>> {
        let operation = Operation::ExceptionTrends;
        self.observe(tenant_id, operation, async {
            let (tenant, handle, ctx, window) = self.prepare_analysis(tenant_id, operation, spec)?;
            let report = self
                .analysis
                .trend_by_service(&handle, &tenant.exception_indices(), &window, &ctx)
                .await?;
            Ok(OperationResponse::new(ctx, report))
        })
        .await
    }

    /// Deep analysis of one exception message; `NotFound` when it never occurred in the window
    pub async fn analyze_exception(
        &self,
        tenant_id: &str,
        message: &str,
        spec: &FilterSpec,
    ) -> Result<OperationResponse<SpecificExceptionAnalysis>> {
        let operation = Operation::AnalyzeException;
        self.observe(tenant_id, operation, async {
            let message = message.trim();
            if message.is_empty() {
                return Err(AppError::Validation(
                    "exception message must not be empty".to_string(),
                ));
            }

            let (tenant, handle, ctx, window) = self.prepare_analysis(tenant_id, operation, spec)?;
            let analysis = self
                .analysis
                .analyze_specific(&handle, &tenant.exception_indices(), message, &window, &ctx)
                .await?;
            Ok(OperationResponse::new(ctx, analysis))
        })
        .await
    }

    /// Ask the environment's cluster for its health
    pub async fn check_connection(
        &self,
        tenant_id: &str,
        environment: Option<&str>,
    ) -> Result<OperationResponse<ConnectionStatus>> {
        let operation = Operation::CheckConnection;
        self.observe(tenant_id, operation, async {
            let spec = FilterSpec {
                environment: environment.map(str::to_string),
                ..FilterSpec::default()
            };
            let (_, handle) = self.prepare(tenant_id, operation, &spec)?;
            let ctx = QueryContext::for_handle(&handle, operation);

            let health = handle
                .client()
                .health()
                .await
                .map_err(|e| ctx.search_error(e))?;
            let status = ConnectionStatus {
                endpoint: handle.client().endpoint().to_string(),
                status: health.status,
                cluster_name: health.cluster_name,
                number_of_nodes: health.number_of_nodes,
            };
            Ok(OperationResponse::new(ctx, status))
        })
        .await
    }

    pub fn list_tenants(&self) -> Vec<TenantSummary> {
        self.registry
            .snapshot()
            .values()
            .map(|tenant| TenantSummary {
                tenant_id: tenant.tenant_id.clone(),
                display_name: tenant.display_name.clone(),
                default_environment: tenant.default_environment.clone(),
            })
            .collect()
    }

    pub fn list_environments(&self, tenant_id: &str) -> Result<Vec<EnvironmentSummary>> {
        let tenant = self.registry.get_config(tenant_id)?;
        Ok(tenant
            .environments
            .iter()
            .map(|(name, env)| EnvironmentSummary {
                name: name.clone(),
                endpoint: redact_userinfo(&env.endpoint),
                is_default: tenant.default_environment.as_deref() == Some(name.as_str()),
            })
            .collect())
    }

    /// Swap in a new tenant set; requests already running keep their snapshot
    pub fn reload_tenants(&self, tenants: TenantSet) {
        self.registry.reload(tenants);
    }

    pub fn reload_tenants_from_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        self.registry.reload_from_file(path)
    }

    /// Close every cached store connection
    pub async fn shutdown(&self) {
        info!(connections = self.connections.len(), "Shutting down insight service");
        self.connections.release_all().await;
    }

    fn prepare(
        &self,
        tenant_id: &str,
        operation: Operation,
        spec: &FilterSpec,
    ) -> Result<(Arc<TenantConfig>, ConnectionHandle)> {
        spec.check()?;
        let tenant = self.registry.get_config(tenant_id)?;
        tenant.ensure_permitted(operation)?;
        let handle = self
            .connections
            .acquire(&tenant, spec.environment.as_deref())?;
        Ok((tenant, handle))
    }

    fn prepare_analysis(
        &self,
        tenant_id: &str,
        operation: Operation,
        spec: &FilterSpec,
    ) -> Result<(Arc<TenantConfig>, ConnectionHandle, QueryContext, TimeWindow)> {
        let (tenant, handle) = self.prepare(tenant_id, operation, spec)?;
        let window = spec.resolve_window(analysis_window(), Utc::now());
        let ctx = QueryContext::for_handle(&handle, operation).with_window(window);
        Ok((tenant, handle, ctx, window))
    }

    async fn observe<T, F>(&self, tenant_id: &str, operation: Operation, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        let result = fut.await;
        let elapsed = started.elapsed();

        match &result {
            Ok(_) => {
                record_operation(operation.as_ref(), "success", elapsed);
                debug!(
                    tenant_id,
                    operation = %operation,
                    duration_ms = elapsed.as_millis() as u64,
                    "Operation completed"
                );
            }
            Err(e) => {
                record_operation(operation.as_ref(), e.error_code(), elapsed);
                if e.is_client_error() {
                    debug!(tenant_id, operation = %operation, error = %e, "Operation rejected");
                } else {
                    warn!(tenant_id, operation = %operation, error = %e, "Operation failed");
                }
            }
        }

        result
    }
}
