//! Identity-provider layout against an in-memory provider.

mod common;

use std::sync::Arc;

use common::InMemoryIdp;
use lodestar_core::{BackendError, Outcome, ResourceKind};
use lodestar_reconcile::{IdpLayout, LayoutPlan, ReconcileError};

fn plan() -> LayoutPlan {
    LayoutPlan {
        realm: "elk".into(),
        groups: vec!["kibana".into()],
        subgroups: vec!["billing".into(), "ops".into()],
        role_suffixes: vec!["read".into(), "admin".into()],
    }
}

#[tokio::test]
async fn test_layout_builds_realm_groups_and_roles() {
    let idp = Arc::new(InMemoryIdp::new());

    let report = IdpLayout::new(idp.clone()).apply(&plan()).await.unwrap();

    assert!(idp.has_realm("elk"));
    for key in plan().role_keys() {
        assert!(idp.has_role(&key), "missing realm role {key}");
    }
    assert!(idp.is_assigned("/kibana/billing/kibanabillingread", "kibanabillingread"));
    assert!(idp.is_assigned("/kibana/ops/kibanaopsadmin", "kibanaopsadmin"));

    // realm + 1 group + 2 subgroups + 4 leaves * (group, role, assignment)
    assert_eq!(report.steps.len(), 16);
    assert_eq!(report.summary().created, 16);
    assert_eq!(report.steps[0].kind, ResourceKind::Realm);
    assert_eq!(report.steps[1].name, "/kibana");
}

#[tokio::test]
async fn test_layout_is_idempotent() {
    let idp = Arc::new(InMemoryIdp::new());
    let layout = IdpLayout::new(idp.clone());

    layout.apply(&plan()).await.unwrap();
    let groups = idp.paths().len();
    let second = layout.apply(&plan()).await.unwrap();

    assert_eq!(second.summary().already_present, 16);
    assert_eq!(idp.paths().len(), groups);
}

#[tokio::test]
async fn test_existing_groups_are_reused() {
    let idp = Arc::new(InMemoryIdp::with_paths(&["/kibana/billing"]));
    idp.add_realm("elk");

    let report = IdpLayout::new(idp.clone()).apply(&plan()).await.unwrap();

    let outcome = |name: &str| {
        report
            .steps
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.outcome)
    };
    assert_eq!(outcome("elk"), Some(Outcome::AlreadyPresent));
    assert_eq!(outcome("/kibana"), Some(Outcome::AlreadyPresent));
    assert_eq!(outcome("/kibana/billing"), Some(Outcome::AlreadyPresent));
    assert_eq!(outcome("/kibana/ops"), Some(Outcome::Created));
    assert_eq!(
        idp.paths()
            .iter()
            .filter(|p| p.as_str() == "/kibana/billing")
            .count(),
        1
    );
}

#[tokio::test]
async fn test_failed_subgroup_skips_only_its_branch() {
    let idp = Arc::new(InMemoryIdp::new());
    idp.fail_create("billing", BackendError::transport("HTTP 502"));

    let report = IdpLayout::new(idp.clone()).apply(&plan()).await.unwrap();

    let billing: Vec<_> = report
        .steps
        .iter()
        .filter(|s| s.name.contains("billing"))
        .map(|s| s.outcome)
        .collect();
    assert_eq!(billing[0], Outcome::Failed);
    assert!(billing[1..].iter().all(|o| *o == Outcome::Skipped));
    assert_eq!(billing.len(), 1 + 2 * 3);

    assert!(idp.has_role("kibanaopsread"));
    assert!(!idp.has_role("kibanabillingread"));
    assert_eq!(report.summary().failed, 1);
}

#[tokio::test]
async fn test_fatal_error_aborts_layout() {
    let idp = Arc::new(InMemoryIdp::new());
    idp.fail_create("kibana", BackendError::authentication("HTTP 403"));

    let err = IdpLayout::new(idp.clone()).apply(&plan()).await.unwrap_err();

    assert!(matches!(err, ReconcileError::Aborted(_)));
    assert!(idp.paths().is_empty());
}
