//! Document store access: the client seam, its HTTP implementation and
//! typed response shapes.

mod client;
mod error;
mod http;
mod response;

pub use client::StoreClient;
pub use error::{StoreError, StoreResult};
pub use http::{redact_userinfo, HttpStoreClient};
pub use response::{ClusterHealth, RawHit, RawHits, RawSearchResponse, TotalHits};
