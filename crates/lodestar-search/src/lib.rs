//! Search-engine and dashboard admin API client.
//!
//! [`SearchClient`] speaks the search engine's REST admin API (lifecycle
//! policies, index templates, indices, roles, role mappings) and the
//! dashboard's saved-objects API (data views). It implements
//! [`lodestar_core::ResourceBackend`] so the reconciler can drive it through
//! the shared create-if-absent protocol.

pub mod backend;
pub mod client;
pub mod error;
pub mod models;

pub use client::{BasicCredentials, HealthCheckResult, SearchClient, SearchConnection};
pub use error::{SearchError, SearchResult};
