//! Exception analytics computed from store aggregations
//!
//! - **Summaries**: totals, distinct messages, top messages with first and
//!   last occurrence, hourly distribution
//! - **Frequency ranking**: most repeated error messages with their latest
//!   occurrence
//! - **Trends**: first-half/second-half comparison per service and message
//! - **Specific analysis**: one message's matches, trend, affected services
//!   and rule-based cause suggestions
//!
//! # Example
//!
//! ```no_run
//! use llm_log_insights::analytics::{classify, percentage_change, Trend};
//!
//! let change = percentage_change(40.0, 55.0);
//! assert_eq!(classify(change), Trend::Increasing);
//! ```

mod aggregation;
mod causation;
mod engine;
mod models;
mod statistics;

pub use aggregation::{is_error_document, HISTOGRAM_INTERVAL};
pub use causation::{
    CausationHeuristics, CausationRule, Suggestions, CAUSATION_RULES, FALLBACK_CAUSES,
    FALLBACK_SOLUTIONS,
};
pub use engine::{AnalysisEngine, AnalyticsConfig};
pub use models::{
    AggregationSummary, FrequencyRanking, MessageSummary, ServiceCount, ServiceTrendReport,
    SpecificExceptionAnalysis, TimeBucket, Trend, TrendRecord,
};
pub use statistics::{
    classify, percentage_change, trend_between, trend_over_time, TREND_THRESHOLD,
};
