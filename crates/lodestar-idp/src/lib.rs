//! Identity-provider admin API client.
//!
//! - [`auth`] - Admin token acquisition (password grant, client credentials)
//! - [`client`] - Realm, group, realm-role and role-mapping endpoints
//! - [`directory`] - `GroupDirectory` / `IdentityAdmin` adapters
//! - [`walker`] - Lazy depth-first walk over the group forest

pub mod auth;
pub mod client;
pub mod directory;
pub mod error;
pub mod models;
pub mod walker;

pub use auth::{IdpAuth, IdpCredentials};
pub use client::{HealthCheckResult, IdpClient, IdpConnection};
pub use error::{IdpError, IdpResult};
pub use walker::{GroupWalker, SubtreeFailure, WalkSummary};
