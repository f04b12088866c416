use crate::store::StoreError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Unknown tenant, unresolvable environment or malformed tenant configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Operation not in the tenant's allow-list
    #[error("Operation '{operation}' is not permitted for tenant '{tenant_id}'")]
    NotPermitted { tenant_id: String, operation: String },

    /// Store or transport failure, timeouts included
    #[error("Search failed for tenant '{tenant_id}' in environment '{environment}' during {operation}: {source}")]
    SearchExecution {
        tenant_id: String,
        environment: String,
        operation: String,
        #[source]
        source: StoreError,
    },

    /// Nothing matched the request
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Get error code string
    pub fn error_code(&self) -> &str {
        match self {
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::NotPermitted { .. } => "NOT_PERMITTED",
            AppError::SearchExecution { .. } => "SEARCH_EXECUTION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Io(_) => "IO_ERROR",
        }
    }

    /// Whether the caller caused this error (as opposed to the store or the deployment)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::NotPermitted { .. } | AppError::NotFound(_) | AppError::Validation(_)
        )
    }
}

/// Conversion from serde_json::Error
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Conversion from serde_yaml::Error
impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Conversion from toml::de::Error
impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Conversion from validator::ValidationErrors
impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Conversion from config::ConfigError
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;
