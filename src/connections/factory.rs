use crate::connections::cache::ConnectionKey;
use crate::store::{HttpStoreClient, StoreClient, StoreResult};
use crate::tenants::EnvironmentConfig;
use std::sync::Arc;

/// Builds store clients for cache misses
pub trait ClientFactory: Send + Sync {
    fn create(
        &self,
        key: &ConnectionKey,
        environment: &EnvironmentConfig,
    ) -> StoreResult<Arc<dyn StoreClient>>;
}

/// Factory producing reqwest-backed [`HttpStoreClient`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpClientFactory;

impl ClientFactory for HttpClientFactory {
    fn create(
        &self,
        _key: &ConnectionKey,
        environment: &EnvironmentConfig,
    ) -> StoreResult<Arc<dyn StoreClient>> {
        Ok(Arc::new(HttpStoreClient::new(environment)?))
    }
}
