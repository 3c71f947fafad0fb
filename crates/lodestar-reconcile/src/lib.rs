//! Reconciliation engine.
//!
//! - [`desired`] - Per-tenant desired state
//! - [`reconciler`] - Bounded, cancellable tenant pool
//! - [`grant`] - Serialized merges into the aggregated role
//! - [`mappings`] - Group-driven role-mapping sync
//! - [`idp_layout`] - Realm, group and realm-role layout on the identity provider
//! - [`report`] - Run reports
//!
//! # Example
//!
//! ```
//! use lodestar_core::TenantName;
//! use lodestar_reconcile::{DesiredState, ProvisioningDefaults, RoleNaming};
//!
//! let tenant = TenantName::parse("billing").unwrap();
//! let desired =
//!     DesiredState::generate(&tenant, &ProvisioningDefaults::default(), &RoleNaming::Dashed)
//!         .unwrap();
//! assert_eq!(desired.specs.len(), 6);
//! ```

pub mod defaults;
pub mod desired;
pub mod error;
pub mod grant;
pub mod idp_layout;
pub mod mappings;
pub mod reconciler;
pub mod report;

pub use defaults::{ProvisioningDefaults, RolePrivileges};
pub use desired::{DesiredState, RoleNaming};
pub use error::{ReconcileError, ReconcileResult};
pub use grant::{GrantMerger, GrantOutcome};
pub use idp_layout::{IdpLayout, LayoutPlan};
pub use mappings::{MappingNaming, MappingOutcome, MappingReport, RoleMappingSync, SuffixFilter};
pub use reconciler::{ReconcileOptions, TenantReconciler};
pub use report::{GrantRecord, GrantStatus, LayoutReport, RunReport, RunSummary, TenantReport};
