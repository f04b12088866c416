//! Store connection lifecycle: one lazily created client per tenant environment

mod cache;
mod factory;

pub use cache::{ConnectionCache, ConnectionHandle, ConnectionKey};
pub use factory::{ClientFactory, HttpClientFactory};
