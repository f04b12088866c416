//! Tenant registry with atomic whole-set reloads

use crate::error::{AppError, Result};
use crate::tenants::models::TenantConfig;
use crate::tenants::validation::validate_tenant;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Immutable set of tenant configurations keyed by tenant id
pub type TenantSet = BTreeMap<String, Arc<TenantConfig>>;

/// Read interface the engine consumes
pub trait TenantProvider: Send + Sync {
    /// Look up a tenant's configuration snapshot
    fn get_config(&self, tenant_id: &str) -> Result<Arc<TenantConfig>>;
}

/// Serialization format of a tenant document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Toml,
    Json,
}

impl DocumentFormat {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            other => Err(AppError::Configuration(format!(
                "unsupported tenant document extension {:?} for {}",
                other,
                path.display()
            ))),
        }
    }
}

/// Holds the current tenant set behind a swap pointer.
///
/// Readers clone the inner `Arc` and keep using that snapshot for the rest
/// of their request, so a reload never exposes a half-updated set.
pub struct TenantRegistry {
    tenants: RwLock<Arc<TenantSet>>,
}

impl TenantRegistry {
    /// Create a registry from an already validated set
    pub fn new(tenants: TenantSet) -> Self {
        Self {
            tenants: RwLock::new(Arc::new(tenants)),
        }
    }

    /// Validate raw configurations and build a registry from them
    pub fn from_configs(configs: BTreeMap<String, TenantConfig>) -> Result<Self> {
        Ok(Self::new(prepare(configs)?))
    }

    /// Load and validate a tenant document from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(read_document(path.as_ref())?))
    }

    /// Parse and validate a tenant document held in memory
    pub fn parse_document(contents: &str, format: DocumentFormat) -> Result<TenantSet> {
        let parsed: Result<BTreeMap<String, TenantConfig>> = match format {
            DocumentFormat::Yaml => serde_yaml::from_str(contents).map_err(AppError::from),
            DocumentFormat::Toml => toml::from_str(contents).map_err(AppError::from),
            DocumentFormat::Json => serde_json::from_str(contents).map_err(AppError::from),
        };
        let configs = parsed.map_err(|e| {
            AppError::Configuration(format!("malformed tenant document: {}", e))
        })?;
        prepare(configs)
    }

    /// Current snapshot of every tenant
    pub fn snapshot(&self) -> Arc<TenantSet> {
        self.tenants.read().clone()
    }

    /// Replace the whole tenant set in one step
    pub fn reload(&self, tenants: TenantSet) {
        let count = tenants.len();
        *self.tenants.write() = Arc::new(tenants);
        info!(tenants = count, "Tenant configuration reloaded");
    }

    /// Re-read the tenant document; the current set is kept if the new one is invalid
    pub fn reload_from_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let tenants = read_document(path.as_ref())?;
        let count = tenants.len();
        self.reload(tenants);
        Ok(count)
    }

    /// Ids of all configured tenants, sorted
    pub fn tenant_ids(&self) -> Vec<String> {
        self.snapshot().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tenants.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.read().is_empty()
    }
}

impl TenantProvider for TenantRegistry {
    fn get_config(&self, tenant_id: &str) -> Result<Arc<TenantConfig>> {
        self.tenants
            .read()
            .get(tenant_id)
            .cloned()
            .ok_or_else(|| AppError::Configuration(format!("unknown tenant '{}'", tenant_id)))
    }
}

fn read_document(path: &Path) -> Result<TenantSet> {
    let format = DocumentFormat::from_path(path)?;
    let contents = std::fs::read_to_string(path).map_err(|e| {
        AppError::Configuration(format!(
            "failed to read tenant document {}: {}",
            path.display(),
            e
        ))
    })?;
    debug!(path = %path.display(), ?format, "Parsing tenant document");
    TenantRegistry::parse_document(&contents, format)
}

fn prepare(configs: BTreeMap<String, TenantConfig>) -> Result<TenantSet> {
    let mut tenants = TenantSet::new();
    for (tenant_id, mut config) in configs {
        config.tenant_id = tenant_id.clone();
        validate_tenant(&tenant_id, &config)?;
        tenants.insert(tenant_id, Arc::new(config));
    }
    Ok(tenants)
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
alpha:
  teamName: Alpha Team
  defaultEnvironment: production
  maxSearchResults: 50
  environments:
    production:
      endpoint: http://prod:9200
      apiKey: abc
    staging:
      endpoint: http://staging:9200
  indexPatterns:
    exceptions: ["exceptions-*"]
    applications: ["app-*"]
    logs: ["logs-*"]
beta:
  displayName: Beta Team
  environments:
    production:
      endpoint: http://beta:9200
  indexPatterns:
    exceptions: ["beta-exceptions-*"]
    applications: ["beta-app-*"]
  allowedOperations: [search_exceptions]
"#;

    #[test]
    fn test_parse_yaml_document() {
        let tenants = TenantRegistry::parse_document(YAML, DocumentFormat::Yaml).unwrap();
        assert_eq!(tenants.len(), 2);

        let alpha = &tenants["alpha"];
        assert_eq!(alpha.tenant_id, "alpha");
        assert_eq!(alpha.display_name, "Alpha Team");
        assert_eq!(alpha.environments.len(), 2);

        let beta = &tenants["beta"];
        assert_eq!(beta.max_search_results, 50);
        assert_eq!(beta.allowed_operations.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_parse_json_document() {
        let json = r#"{"gamma": {"displayName": "Gamma",
            "environments": {"prod": {"url": "http://gamma:9200"}},
            "defaultEnvironment": "prod",
            "indexPatterns": {"exceptions": ["g-ex-*"], "applications": ["g-app-*"]}}}"#;
        let tenants = TenantRegistry::parse_document(json, DocumentFormat::Json).unwrap();
        assert_eq!(tenants["gamma"].environments["prod"].endpoint, "http://gamma:9200");
    }

    #[test]
    fn test_missing_application_patterns_rejected() {
        let json = r#"{"gamma": {"displayName": "Gamma",
            "environments": {"prod": {"endpoint": "http://gamma:9200"}},
            "indexPatterns": {"exceptions": ["g-ex-*"]}}}"#;
        let result = TenantRegistry::parse_document(json, DocumentFormat::Json);
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_unknown_tenant() {
        let registry = TenantRegistry::new(
            TenantRegistry::parse_document(YAML, DocumentFormat::Yaml).unwrap(),
        );
        assert!(registry.get_config("alpha").is_ok());
        assert!(matches!(
            registry.get_config("omega"),
            Err(AppError::Configuration(_))
        ));
    }

    #[test]
    fn test_reload_keeps_old_snapshots_intact() {
        let registry = TenantRegistry::new(
            TenantRegistry::parse_document(YAML, DocumentFormat::Yaml).unwrap(),
        );
        let before = registry.snapshot();

        registry.reload(TenantSet::new());

        assert_eq!(before.len(), 2);
        assert!(registry.is_empty());
        assert!(registry.get_config("alpha").is_err());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("tenants.yml")).unwrap(),
            DocumentFormat::Yaml
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("tenants.toml")).unwrap(),
            DocumentFormat::Toml
        );
        assert!(DocumentFormat::from_path(Path::new("tenants.ini")).is_err());
    }
}
