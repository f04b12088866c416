//! Search over tenant exception and log indices.
//!
//! [`QueryBuilder`] turns a [`FilterSpec`] into a store query for one tenant,
//! [`SearchExecutor`] runs it through a cached connection and normalizes the
//! hits into [`SearchResultRecord`]s, and [`SmartSearchMerger`] runs several
//! match strategies for a free-text query concurrently and merges the results.
//!
//! # Example
//!
//! ```no_run
//! use llm_log_insights::search::{FilterSpec, QueryBuilder, SearchKind};
//! # fn demo(tenant: &llm_log_insights::tenants::TenantConfig) {
//! let spec = FilterSpec::new()
//!     .with_timeframe("24h")
//!     .with_service("payment");
//!
//! let query = QueryBuilder::new(tenant).build(SearchKind::Exceptions, &spec);
//! println!("{}", query.body());
//! # }
//! ```

pub mod fields;

mod document;
mod executor;
mod query;
mod smart;

pub use document::{first_text, lookup, parse_timestamp, text_at, SearchResultRecord};
pub use executor::{sort_by_frequency, SearchExecutor, SearchPage};
pub use query::{
    format_timestamp, range_filter, term_filter, text_clause, timestamp_sort, window_from_query,
    BuiltQuery, FilterSpec, QueryBuilder, SearchKind, TextMatch, TimeWindow, Timeframe,
    DEFAULT_EXCEPTION_LIMIT,
};
pub use smart::{
    extract_key_terms, merge_results, plan_strategies, SmartSearchMerger, SmartSearchOutcome,
    Strategy, StrategyQuery, MAX_KEY_TERMS,
};
