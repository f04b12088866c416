//! Tenant ("team") configuration: environments, index patterns, limits and
//! the operation allow-list.
//!
//! Tenant documents are mappings of tenant id to [`TenantConfig`], written in
//! YAML, TOML or JSON:
//!
//! ```yaml
//! alpha:
//!   teamName: Alpha Team
//!   defaultEnvironment: production
//!   maxSearchResults: 50
//!   environments:
//!     production:
//!       endpoint: https://es.prod.internal:9200
//!       apiKey: "..."
//!   indexPatterns:
//!     exceptions: ["exceptions-*"]
//!     applications: ["app-*"]
//!     logs: ["logs-*"]
//!   allowedOperations: [search_exceptions, exception_summary]
//! ```

mod models;
mod registry;
mod validation;

pub use models::{Credentials, EnvironmentConfig, IndexPatterns, Operation, TenantConfig};
pub use registry::{DocumentFormat, TenantProvider, TenantRegistry, TenantSet};
pub use validation::validate_tenant;
