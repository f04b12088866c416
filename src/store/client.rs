use crate::store::error::StoreResult;
use crate::store::response::{ClusterHealth, RawSearchResponse};
use async_trait::async_trait;
use serde_json::Value;

/// A connection to one environment's document store.
///
/// Implementations must be safe to share between concurrent in-flight queries.
#[async_trait]
pub trait StoreClient: Send + Sync + 'static {
    /// Run a search body against the given index patterns
    async fn search(&self, indices: &[String], body: &Value) -> StoreResult<RawSearchResponse>;

    /// Fetch cluster health
    async fn health(&self) -> StoreResult<ClusterHealth>;

    /// Release the connection; later calls fail with `StoreError::Closed`
    async fn close(&self);

    /// Base URL this client talks to
    fn endpoint(&self) -> &str;
}
