use crate::analytics::AnalyticsConfig;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

/// Environment variable naming the optional override file
pub const CONFIG_PATH_ENV: &str = "LLM_LOG_INSIGHTS_CONFIG";

/// Override file read when `LLM_LOG_INSIGHTS_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "config/insights.toml";

/// Prefix of per-key environment overrides, e.g. `LLM_LOG_INSIGHTS__ENGINE__TOP_MESSAGES`
pub const ENV_PREFIX: &str = "LLM_LOG_INSIGHTS";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct Config {
    /// Tenant document location
    #[serde(default)]
    pub tenants: TenantsConfig,

    /// Logging and metrics
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Query engine settings
    #[serde(default)]
    #[validate(nested)]
    pub engine: EngineConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        let config_path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&config_path))
    }

    /// Load with an explicit override file
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::load_with(Some(path), Self::environment())
    }

    /// Layer embedded defaults, an optional file and an environment source
    pub fn load_with(path: Option<&Path>, environment: config::Environment) -> Result<Self> {
        let mut builder = config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ));

        // Override with config file if it exists
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let config: Config = builder
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Environment source with the crate prefix and `__` separators
    pub fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantsConfig {
    /// YAML, TOML or JSON tenant document
    #[serde(default = "default_tenants_path")]
    pub path: PathBuf,
}

impl Default for TenantsConfig {
    fn default() -> Self {
        Self {
            path: default_tenants_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Register Prometheus collectors at startup
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            metrics_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct EngineConfig {
    /// Exception search size when the request has no limit
    #[serde(default = "default_exception_limit")]
    #[validate(range(min = 1))]
    pub default_exception_limit: usize,

    /// Frequency ranking size when the request has no limit
    #[serde(default = "default_frequent_limit")]
    #[validate(range(min = 1))]
    pub default_frequent_limit: usize,

    #[serde(default = "default_top_messages")]
    #[validate(range(min = 1))]
    pub top_messages: usize,

    #[serde(default = "default_affected_services")]
    #[validate(range(min = 1))]
    pub affected_services: usize,

    #[serde(default = "default_trend_services")]
    #[validate(range(min = 1))]
    pub trend_services: usize,

    #[serde(default = "default_trend_messages")]
    #[validate(range(min = 1))]
    pub trend_messages: usize,

    #[serde(default = "default_specific_sample_size")]
    #[validate(range(min = 1))]
    pub specific_sample_size: usize,

    /// Route exception text search through the multi-strategy merger
    #[serde(default = "default_true")]
    pub smart_search_enabled: bool,
}

impl EngineConfig {
    pub fn analytics(&self) -> AnalyticsConfig {
        AnalyticsConfig {
            top_messages: self.top_messages,
            affected_services: self.affected_services,
            trend_services: self.trend_services,
            trend_messages: self.trend_messages,
            specific_sample_size: self.specific_sample_size,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_exception_limit: default_exception_limit(),
            default_frequent_limit: default_frequent_limit(),
            top_messages: default_top_messages(),
            affected_services: default_affected_services(),
            trend_services: default_trend_services(),
            trend_messages: default_trend_messages(),
            specific_sample_size: default_specific_sample_size(),
            smart_search_enabled: true,
        }
    }
}

fn default_tenants_path() -> PathBuf {
    PathBuf::from("config/tenants.yaml")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_exception_limit() -> usize {
    20
}

fn default_frequent_limit() -> usize {
    10
}

fn default_top_messages() -> usize {
    10
}

fn default_affected_services() -> usize {
    10
}

fn default_trend_services() -> usize {
    10
}

fn default_trend_messages() -> usize {
    5
}

fn default_specific_sample_size() -> usize {
    100
}
