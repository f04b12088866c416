//! Aggregation-backed analysis over exception indices

use crate::analytics::aggregation::{
    frequent_body, parse_frequent, parse_histogram, parse_service_counts, parse_summary,
    parse_trend_records, specific_body, summary_body, trend_body,
};
use crate::analytics::causation::CausationHeuristics;
use crate::analytics::models::{
    AggregationSummary, FrequencyRanking, ServiceTrendReport, SpecificExceptionAnalysis, Trend,
};
use crate::analytics::statistics;
use crate::connections::ConnectionHandle;
use crate::context::QueryContext;
use crate::error::{AppError, Result};
use crate::search::{SearchExecutor, SearchResultRecord, TimeWindow};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Bucket and sample sizes for analysis queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Messages listed in a summary
    pub top_messages: usize,

    /// Services listed per summarized message and per specific analysis
    pub affected_services: usize,

    /// Services compared in trend reports
    pub trend_services: usize,

    /// Messages compared in trend reports
    pub trend_messages: usize,

    /// Documents fetched when analyzing one exception
    pub specific_sample_size: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            top_messages: 10,
            affected_services: 10,
            trend_services: 10,
            trend_messages: 5,
            specific_sample_size: 100,
        }
    }
}

/// Runs aggregation queries and derives summaries, rankings and trends
pub struct AnalysisEngine {
    config: AnalyticsConfig,
    executor: SearchExecutor,
    heuristics: CausationHeuristics,
}

impl AnalysisEngine {
    pub fn new(config: AnalyticsConfig) -> Self {
        Self {
            config,
            executor: SearchExecutor::new(),
            heuristics: CausationHeuristics::default(),
        }
    }

    /// Create with default configuration
    pub fn with_defaults() -> Self {
        Self::new(AnalyticsConfig::default())
    }

    pub fn with_heuristics(mut self, heuristics: CausationHeuristics) -> Self {
        self.heuristics = heuristics;
        self
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Totals, distinct messages, top messages and hourly distribution
    pub async fn summarize(
        &self,
        handle: &ConnectionHandle,
        indices: &[String],
        window: &TimeWindow,
        ctx: &QueryContext,
    ) -> Result<AggregationSummary> {
        let body = summary_body(window, self.config.top_messages, self.config.affected_services);
        let response = self.executor.run(handle, indices, &body, ctx).await?;

        let mut summary = parse_summary(response.aggregations());
        if summary.total_count == 0 {
            summary.total_count = response.total_hits();
        }
        Ok(summary)
    }

    /// Most frequent error messages, never more than `limit`
    pub async fn rank_frequent(
        &self,
        handle: &ConnectionHandle,
        indices: &[String],
        window: &TimeWindow,
        limit: usize,
        service: Option<&str>,
        ctx: &QueryContext,
    ) -> Result<Vec<FrequencyRanking>> {
        let body = frequent_body(window, limit, service);
        let response = self.executor.run(handle, indices, &body, ctx).await?;
        Ok(parse_frequent(response.aggregations(), limit))
    }

    /// First-half/second-half comparison per top service and top message
    pub async fn trend_by_service(
        &self,
        handle: &ConnectionHandle,
        indices: &[String],
        window: &TimeWindow,
        ctx: &QueryContext,
    ) -> Result<ServiceTrendReport> {
        let body = trend_body(window, self.config.trend_services, self.config.trend_messages);
        let response = self.executor.run(handle, indices, &body, ctx).await?;
        let aggs = response.aggregations();

        Ok(ServiceTrendReport {
            window: *window,
            midpoint: window.midpoint(),
            services: parse_trend_records(aggs, "services"),
            top_messages: parse_trend_records(aggs, "messages"),
        })
    }

    /// Trend across an ordered bucket sequence
    pub fn trend_over_time(&self, counts: &[u64]) -> Trend {
        statistics::trend_over_time(counts)
    }

    /// Everything known about one exception message; `NotFound` when nothing matches
    pub async fn analyze_specific(
        &self,
        handle: &ConnectionHandle,
        indices: &[String],
        message: &str,
        window: &TimeWindow,
        ctx: &QueryContext,
    ) -> Result<SpecificExceptionAnalysis> {
        let body = specific_body(
            message,
            window,
            self.config.specific_sample_size,
            self.config.affected_services,
        );
        let response = self.executor.run(handle, indices, &body, ctx).await?;

        let representative = response
            .hits
            .hits
            .first()
            .map(SearchResultRecord::from_hit)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "no occurrences of '{}' for tenant '{}' in environment '{}'",
                    message, ctx.tenant_id, ctx.environment
                ))
            })?;

        let aggs = response.aggregations();
        let time_distribution = parse_histogram(aggs, "timeline");
        let counts: Vec<u64> = time_distribution.iter().map(|bucket| bucket.count).collect();
        let trend = self.trend_over_time(&counts);
        let suggestions = self.heuristics.suggest(message);

        debug!(
            tenant_id = %ctx.tenant_id,
            matches = response.total_hits(),
            trend = %trend,
            "Analyzed exception"
        );

        Ok(SpecificExceptionAnalysis {
            representative_occurrence: representative,
            total_matches: response.total_hits(),
            trend,
            affected_services: parse_service_counts(aggs, "services"),
            time_distribution,
            possible_causes: suggestions.causes,
            suggested_solutions: suggestions.solutions,
        })
    }
}

impl Default for AnalysisEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}
