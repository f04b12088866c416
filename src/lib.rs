//! Multi-tenant exception and log analytics over a remote document-search cluster.
//!
//! Each tenant owns one or more environments (clusters) and a set of index
//! patterns. [`service::InsightService`] resolves the tenant, enforces its
//! operation allow-list, reuses a cached connection per tenant and
//! environment, and runs searches or aggregation-backed analyses.

pub mod analytics;
pub mod config;
pub mod connections;
pub mod context;
pub mod error;
pub mod metrics;
pub mod search;
pub mod service;
pub mod store;
pub mod tenants;

pub use error::{AppError, Result};
pub use service::InsightService;
