//! Typed views of store responses

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response of a `_search` request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSearchResponse {
    #[serde(default)]
    pub took: u64,

    #[serde(default)]
    pub timed_out: bool,

    #[serde(default)]
    pub hits: RawHits,

    /// Aggregation results, left untyped and read by the analysis layer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregations: Option<Value>,
}

impl RawSearchResponse {
    /// Number of documents matching the query, independent of the page size
    pub fn total_hits(&self) -> u64 {
        self.hits
            .total
            .as_ref()
            .map(TotalHits::value)
            .unwrap_or(self.hits.hits.len() as u64)
    }

    /// Aggregation results, or `Null` when none were returned
    pub fn aggregations(&self) -> &Value {
        self.aggregations.as_ref().unwrap_or(&Value::Null)
    }
}

/// Hits section of a search response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawHits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<TotalHits>,

    #[serde(default)]
    pub hits: Vec<RawHit>,
}

/// Total hit count; clusters report either a bare number or `{value, relation}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TotalHits {
    Count(u64),
    Object {
        value: u64,
        #[serde(default)]
        relation: Option<String>,
    },
}

impl TotalHits {
    pub fn value(&self) -> u64 {
        match self {
            TotalHits::Count(value) => *value,
            TotalHits::Object { value, .. } => *value,
        }
    }
}

/// A single matching document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawHit {
    #[serde(rename = "_index", default)]
    pub index: String,

    #[serde(rename = "_id", default)]
    pub id: String,

    #[serde(rename = "_score", default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    #[serde(rename = "_source", default)]
    pub source: Value,
}

/// Subset of `_cluster/health`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterHealth {
    #[serde(default)]
    pub cluster_name: String,

    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub number_of_nodes: u64,
}
