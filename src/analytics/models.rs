//! Analysis result types

use crate::search::{SearchResultRecord, TimeWindow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of activity between the two halves of a window
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    #[default]
    Stable,
}

/// One of the most frequent messages in a summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSummary {
    pub message: String,
    pub count: u64,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
    pub affected_services: Vec<String>,
}

/// Hourly histogram bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBucket {
    pub bucket_start: DateTime<Utc>,
    pub count: u64,
}

/// Volume overview of a window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationSummary {
    pub total_count: u64,
    pub unique_message_count: u64,
    pub top_messages: Vec<MessageSummary>,
    pub time_distribution: Vec<TimeBucket>,
}

/// A message ranked by occurrence count, with its latest occurrence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrequencyRanking {
    pub message: String,
    pub count: u64,
    pub last_service: Option<String>,
    pub last_seen: Option<DateTime<Utc>>,
    pub stack_trace: Option<String>,
}

/// Trend of a service or message between the window halves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendRecord {
    pub subject: String,
    pub count: u64,
    pub trend: Trend,
    /// Rounded to the nearest integer
    pub percentage_change: i64,
    pub first_half_count: u64,
    pub second_half_count: u64,
}

/// Per-service and per-message trends for one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTrendReport {
    pub window: TimeWindow,
    pub midpoint: DateTime<Utc>,
    pub services: Vec<TrendRecord>,
    pub top_messages: Vec<TrendRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCount {
    pub service: String,
    pub count: u64,
}

/// Deep dive into one exception message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecificExceptionAnalysis {
    /// Most recent matching occurrence
    pub representative_occurrence: SearchResultRecord,
    pub total_matches: u64,
    pub trend: Trend,
    pub affected_services: Vec<ServiceCount>,
    pub time_distribution: Vec<TimeBucket>,
    pub possible_causes: Vec<String>,
    pub suggested_solutions: Vec<String>,
}
