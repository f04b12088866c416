//! Per tenant/environment cache of store client handles

use crate::connections::factory::{ClientFactory, HttpClientFactory};
use crate::error::{AppError, Result};
use crate::metrics::STORE_CONNECTIONS_CREATED_TOTAL;
use crate::store::StoreClient;
use crate::tenants::TenantConfig;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Cache key: one handle per (tenant, environment)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionKey {
    pub tenant_id: String,
    pub environment: String,
}

impl ConnectionKey {
    pub fn new(tenant_id: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            environment: environment.into(),
        }
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tenant_id, self.environment)
    }
}

/// A shared store client bound to the environment it was resolved for
#[derive(Clone)]
pub struct ConnectionHandle {
    pub tenant_id: String,
    pub environment: String,
    client: Arc<dyn StoreClient>,
}

impl ConnectionHandle {
    pub fn new(key: &ConnectionKey, client: Arc<dyn StoreClient>) -> Self {
        Self {
            tenant_id: key.tenant_id.clone(),
            environment: key.environment.clone(),
            client,
        }
    }

    pub fn client(&self) -> &dyn StoreClient {
        self.client.as_ref()
    }

    /// Whether two handles share the same underlying client
    pub fn same_client(&self, other: &ConnectionHandle) -> bool {
        Arc::ptr_eq(&self.client, &other.client)
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("tenant_id", &self.tenant_id)
            .field("environment", &self.environment)
            .field("endpoint", &self.client.endpoint())
            .finish()
    }
}

/// Lazily creates and reuses one store client per (tenant, environment).
///
/// Lookup and insertion for a key happen under that key's shard lock, so
/// concurrent first use of the same key creates exactly one client while
/// unrelated keys proceed independently.
pub struct ConnectionCache {
    handles: DashMap<ConnectionKey, ConnectionHandle>,
    factory: Arc<dyn ClientFactory>,
}

impl ConnectionCache {
    /// Create a cache backed by HTTP clients
    pub fn new() -> Self {
        Self::with_factory(Arc::new(HttpClientFactory))
    }

    pub fn with_factory(factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            handles: DashMap::new(),
            factory,
        }
    }

    /// Resolve the environment and return its cached handle, creating it on first use
    pub fn acquire(
        &self,
        tenant: &TenantConfig,
        environment: Option<&str>,
    ) -> Result<ConnectionHandle> {
        let (env_name, env_config) = tenant.resolve_environment(environment)?;
        let key = ConnectionKey::new(&tenant.tenant_id, env_name);

        if let Some(handle) = self.handles.get(&key) {
            return Ok(handle.value().clone());
        }

        match self.handles.entry(key) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let client = self
                    .factory
                    .create(entry.key(), env_config)
                    .map_err(|source| {
                        AppError::Configuration(format!(
                            "failed to create store client for {}: {}",
                            entry.key(),
                            source
                        ))
                    })?;
                let handle = ConnectionHandle::new(entry.key(), client);

                STORE_CONNECTIONS_CREATED_TOTAL.inc();
                info!(
                    tenant_id = %handle.tenant_id,
                    environment = %handle.environment,
                    endpoint = %handle.client().endpoint(),
                    "Created store connection"
                );

                Ok(entry.insert(handle).clone())
            }
        }
    }

    /// Close every cached handle and empty the cache
    pub async fn release_all(&self) {
        let keys: Vec<ConnectionKey> = self.handles.iter().map(|e| e.key().clone()).collect();
        let mut released = 0usize;

        for key in keys {
            if let Some((key, handle)) = self.handles.remove(&key) {
                handle.client().close().await;
                debug!(connection = %key, "Released store connection");
                released += 1;
            }
        }

        self.handles.clear();
        info!(released, "Released all store connections");
    }

    pub fn contains(&self, tenant_id: &str, environment: &str) -> bool {
        self.handles
            .contains_key(&ConnectionKey::new(tenant_id, environment))
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl Default for ConnectionCache {
    fn default() -> Self {
        Self::new()
    }
}
