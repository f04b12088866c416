//! Executes built queries and normalizes the hits

use crate::connections::ConnectionHandle;
use crate::context::QueryContext;
use crate::error::Result;
use crate::search::document::SearchResultRecord;
use crate::search::query::BuiltQuery;
use crate::store::RawSearchResponse;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::time::Instant;
use tracing::debug;

/// One page of normalized results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub records: Vec<SearchResultRecord>,
    /// Matches in the store, not just the ones returned
    pub total_hits: u64,
}

/// Runs queries through a connection handle
#[derive(Debug, Clone, Default)]
pub struct SearchExecutor {
    source_fields: Option<Vec<String>>,
}

impl SearchExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict `_source` to these fields
    pub fn with_source_fields(mut self, fields: Vec<String>) -> Self {
        self.source_fields = Some(fields);
        self
    }

    /// Run a search query and map its hits, never returning more than the query's size
    pub async fn execute(
        &self,
        handle: &ConnectionHandle,
        query: &BuiltQuery,
        ctx: &QueryContext,
    ) -> Result<SearchPage> {
        let mut body = query.body();
        if let Some(fields) = &self.source_fields {
            body["_source"] = Value::from(fields.clone());
        }

        let response = self.run(handle, &query.indices, &body, ctx).await?;
        let total_hits = response.total_hits();
        let mut records: Vec<SearchResultRecord> = response
            .hits
            .hits
            .iter()
            .map(SearchResultRecord::from_hit)
            .collect();
        records.truncate(query.size);

        Ok(SearchPage {
            records,
            total_hits,
        })
    }

    /// Send a raw body, wrapping store failures with the request context
    pub async fn run(
        &self,
        handle: &ConnectionHandle,
        indices: &[String],
        body: &Value,
        ctx: &QueryContext,
    ) -> Result<RawSearchResponse> {
        let started = Instant::now();
        let response = handle
            .client()
            .search(indices, body)
            .await
            .map_err(|e| ctx.search_error(e))?;

        debug!(
            tenant_id = %ctx.tenant_id,
            environment = %ctx.environment,
            operation = %ctx.operation,
            indices = %indices.join(","),
            hits = response.hits.hits.len(),
            took_ms = response.took,
            duration_ms = started.elapsed().as_millis() as u64,
            "Search executed"
        );

        Ok(response)
    }
}

/// Reorder so the most repeated messages come first; ties keep their order
pub fn sort_by_frequency(records: &mut [SearchResultRecord]) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for record in records.iter() {
        *counts.entry(record.message.clone()).or_insert(0) += 1;
    }
    records.sort_by_key(|record| Reverse(counts.get(&record.message).copied().unwrap_or(0)));
}
