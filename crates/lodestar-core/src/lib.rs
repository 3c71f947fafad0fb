//! lodestar Core Library
//!
//! Shared types and traits for the lodestar provisioning tools.
//!
//! # Modules
//!
//! - [`naming`] - Tenant validation and derived resource names
//! - [`resource`] - Resource kinds, specifications and acknowledgments
//! - [`group`] - Identity-provider group nodes and paths
//! - [`traits`] - Backend adapter traits (`ResourceBackend`, `GroupDirectory`, `IdentityAdmin`)
//! - [`error`] - Backend error taxonomy (`BackendError`)
//! - [`outcome`] - Per-resource outcome records
//! - [`retry`] - Exponential backoff for transient failures
//!
//! # Example
//!
//! ```
//! use lodestar_core::naming::{self, TenantName};
//! use lodestar_core::RoleKind;
//!
//! let tenant = TenantName::parse("billing").unwrap();
//! assert_eq!(naming::template_name(&tenant), "billing-template");
//! assert_eq!(naming::role_name(&tenant, RoleKind::Read), "billing-read");
//! ```

pub mod error;
pub mod group;
pub mod naming;
pub mod outcome;
pub mod resource;
pub mod retry;
pub mod traits;

pub use error::{BackendError, BackendResult, FailureKind};
pub use group::GroupNode;
pub use naming::{NamingError, TenantName};
pub use outcome::{Outcome, ResourceOutcome};
pub use resource::{Ack, ResourceKind, ResourceSpec, RoleKind};
pub use retry::{Retryable, RetryPolicy};
pub use traits::{GroupDirectory, IdentityAdmin, ResourceBackend};
