//! Tenant configuration data model

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use validator::Validate;

/// Named logical operations subject to a tenant's allow-list
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    SearchExceptions,
    SearchLogs,
    ExceptionSummary,
    FrequentExceptions,
    ExceptionTrends,
    AnalyzeException,
    CheckConnection,
}

/// Credentials used to reach one environment's cluster
#[derive(Clone, PartialEq, Eq, Default)]
pub enum Credentials {
    ApiKey(String),
    UsernamePassword { username: String, password: String },
    #[default]
    None,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            Credentials::UsernamePassword { username, .. } => f
                .debug_struct("UsernamePassword")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Credentials::None => f.write_str("None"),
        }
    }
}

/// Connection settings for one deployment environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEnvironmentConfig", into = "RawEnvironmentConfig")]
pub struct EnvironmentConfig {
    /// Cluster base URL; may be empty for environments that are declared but not wired up
    pub endpoint: String,

    /// Active credential form
    pub credentials: Credentials,

    /// Additional transport attempts after a retryable failure
    pub max_retries: u32,

    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl EnvironmentConfig {
    /// Create an unauthenticated environment with default retry and timeout settings
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            credentials: Credentials::None,
            max_retries: default_max_retries(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    pub fn has_endpoint(&self) -> bool {
        !self.endpoint.trim().is_empty()
    }
}

/// On-disk shape of an environment: flat optional credential fields
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEnvironmentConfig {
    #[serde(default, alias = "url", alias = "host")]
    endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[serde(default = "default_max_retries")]
    max_retries: u32,
    #[serde(default = "default_request_timeout_ms")]
    request_timeout_ms: u64,
}

impl TryFrom<RawEnvironmentConfig> for EnvironmentConfig {
    type Error = String;

    fn try_from(raw: RawEnvironmentConfig) -> std::result::Result<Self, Self::Error> {
        let credentials = match (raw.api_key, raw.username, raw.password) {
            (Some(_), Some(_), _) => {
                return Err("apiKey and username/password are mutually exclusive".to_string())
            }
            (Some(key), None, _) => Credentials::ApiKey(key),
            (None, Some(username), Some(password)) => {
                Credentials::UsernamePassword { username, password }
            }
            (None, Some(_), None) => return Err("username requires a password".to_string()),
            (None, None, Some(_)) => return Err("password requires a username".to_string()),
            (None, None, None) => Credentials::None,
        };

        Ok(Self {
            endpoint: raw.endpoint,
            credentials,
            max_retries: raw.max_retries,
            request_timeout_ms: raw.request_timeout_ms,
        })
    }
}

impl From<EnvironmentConfig> for RawEnvironmentConfig {
    fn from(env: EnvironmentConfig) -> Self {
        let (api_key, username, password) = match env.credentials {
            Credentials::ApiKey(key) => (Some(key), None, None),
            Credentials::UsernamePassword { username, password } => {
                (None, Some(username), Some(password))
            }
            Credentials::None => (None, None, None),
        };

        Self {
            endpoint: env.endpoint,
            api_key,
            username,
            password,
            max_retries: env.max_retries,
            request_timeout_ms: env.request_timeout_ms,
        }
    }
}

/// Index patterns a tenant searches, grouped by document family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IndexPatterns {
    #[validate(length(min = 1, message = "exceptions index patterns must not be empty"))]
    pub exceptions: Vec<String>,

    #[validate(length(min = 1, message = "applications index patterns must not be empty"))]
    pub applications: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<String>>,
}

/// Configuration of a single tenant ("team")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TenantConfig {
    /// Filled from the document key when loaded through the registry
    #[serde(default)]
    pub tenant_id: String,

    #[serde(alias = "teamName")]
    #[validate(length(min = 1, message = "display name must not be empty"))]
    pub display_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_environment: Option<String>,

    pub environments: BTreeMap<String, EnvironmentConfig>,

    #[validate(nested)]
    pub index_patterns: IndexPatterns,

    #[serde(default = "default_max_search_results")]
    #[validate(range(min = 1, message = "maxSearchResults must be at least 1"))]
    pub max_search_results: usize,

    /// When set, only these operations may run for the tenant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_operations: Option<BTreeSet<Operation>>,
}

impl TenantConfig {
    /// Create a tenant with no environments; add them with `with_environment`
    pub fn new(
        tenant_id: impl Into<String>,
        display_name: impl Into<String>,
        index_patterns: IndexPatterns,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            display_name: display_name.into(),
            default_environment: None,
            environments: BTreeMap::new(),
            index_patterns,
            max_search_results: default_max_search_results(),
            allowed_operations: None,
        }
    }

    pub fn with_environment(mut self, name: impl Into<String>, env: EnvironmentConfig) -> Self {
        self.environments.insert(name.into(), env);
        self
    }

    pub fn with_default_environment(mut self, name: impl Into<String>) -> Self {
        self.default_environment = Some(name.into());
        self
    }

    pub fn with_max_search_results(mut self, max: usize) -> Self {
        self.max_search_results = max;
        self
    }

    pub fn with_allowed_operations(mut self, ops: impl IntoIterator<Item = Operation>) -> Self {
        self.allowed_operations = Some(ops.into_iter().collect());
        self
    }

    /// Whether the allow-list (if any) includes the operation
    pub fn is_permitted(&self, operation: Operation) -> bool {
        self.allowed_operations
            .as_ref()
            .map_or(true, |allowed| allowed.contains(&operation))
    }

    /// Fail with `NotPermitted` unless the operation is allowed
    pub fn ensure_permitted(&self, operation: Operation) -> Result<()> {
        if self.is_permitted(operation) {
            Ok(())
        } else {
            Err(AppError::NotPermitted {
                tenant_id: self.tenant_id.clone(),
                operation: operation.to_string(),
            })
        }
    }

    /// Resolve an explicit or default environment to its name and settings
    pub fn resolve_environment(&self, requested: Option<&str>) -> Result<(&str, &EnvironmentConfig)> {
        let name = requested
            .filter(|name| !name.trim().is_empty())
            .or(self.default_environment.as_deref())
            .ok_or_else(|| {
                AppError::Configuration(format!(
                    "tenant '{}' has no default environment and none was requested",
                    self.tenant_id
                ))
            })?;

        let (name, env) = self.environments.get_key_value(name).ok_or_else(|| {
            AppError::Configuration(format!(
                "environment '{}' is not configured for tenant '{}'",
                name, self.tenant_id
            ))
        })?;

        if !env.has_endpoint() {
            return Err(AppError::Configuration(format!(
                "environment '{}' of tenant '{}' has no endpoint",
                name, self.tenant_id
            )));
        }

        Ok((name.as_str(), env))
    }

    /// Index patterns searched for exception documents
    pub fn exception_indices(&self) -> Vec<String> {
        self.index_patterns.exceptions.clone()
    }

    /// Index patterns searched for log lines: applications plus logs, without duplicates
    pub fn log_indices(&self) -> Vec<String> {
        let mut indices = self.index_patterns.applications.clone();
        for pattern in self.index_patterns.logs.iter().flatten() {
            if !indices.contains(pattern) {
                indices.push(pattern.clone());
            }
        }
        indices
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_max_search_results() -> usize {
    50
}
