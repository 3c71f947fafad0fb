//! Human-readable and JSON report output.

use std::fmt::Write as _;

use lodestar_core::{Outcome, ResourceOutcome};
use lodestar_reconcile::{GrantStatus, LayoutReport, MappingReport, RunReport, RunSummary};
use serde::Serialize;

use crate::error::CliResult;

const RESET: &str = "\x1b[0m";

/// Whether ANSI colors should be used on stdout.
pub fn use_color() -> bool {
    std::env::var("NO_COLOR").is_err()
}

/// Print any report as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn color(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Created | Outcome::Updated => "\x1b[32m",
        Outcome::AlreadyPresent => "\x1b[90m",
        Outcome::Failed => "\x1b[31m",
        Outcome::Skipped | Outcome::Cancelled => "\x1b[33m",
    }
}

fn status(outcome: Outcome, colored: bool) -> String {
    if colored {
        format!("{}{} {}{RESET}", color(outcome), outcome.symbol(), outcome.display())
    } else {
        format!("{} {}", outcome.symbol(), outcome.display())
    }
}

fn resource_line(out: &mut String, record: &ResourceOutcome, colored: bool) {
    let _ = write!(
        out,
        "  {:<22} {:<40} {}",
        record.kind.as_str(),
        record.name,
        status(record.outcome, colored)
    );
    if let Some(error) = &record.error {
        let _ = write!(out, "  ({error})");
    }
    out.push('\n');
}

fn summary_line(out: &mut String, summary: &RunSummary) {
    let _ = writeln!(
        out,
        "Created: {}  Already present: {}  Updated: {}  Failed: {}  Skipped: {}  Cancelled: {}",
        summary.created,
        summary.already_present,
        summary.updated,
        summary.failed,
        summary.skipped,
        summary.cancelled
    );
}

pub fn render_run_report(report: &RunReport, colored: bool) -> String {
    let mut out = String::new();
    for tenant in &report.tenants {
        let _ = writeln!(out, "Tenant {}", tenant.tenant);
        for record in &tenant.resources {
            resource_line(&mut out, record, colored);
        }
        if let Some(grant) = &tenant.grant {
            let _ = write!(
                out,
                "  {:<22} {:<40} {}",
                "aggregated grant",
                format!("{} <- {}", grant.role, grant.pattern),
                grant.outcome.display()
            );
            if let Some(error) = &grant.error {
                let _ = write!(out, "  ({error})");
            }
            out.push('\n');
        }
        out.push('\n');
    }
    summary_line(&mut out, &report.summary());
    let ungranted = report
        .tenants
        .iter()
        .filter(|t| {
            t.grant
                .as_ref()
                .is_some_and(|g| g.outcome == GrantStatus::RoleNotFound)
        })
        .count();
    if ungranted > 0 {
        let _ = writeln!(
            out,
            "Aggregated role missing: {ungranted} tenant(s) were not granted"
        );
    }
    out
}

pub fn render_mapping_report(report: &MappingReport, colored: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Visited {} group(s)", report.visited.len());
    for mapping in &report.mappings {
        let _ = write!(
            out,
            "  {:<40} {:<24} {}",
            mapping.group_path,
            mapping.role,
            status(mapping.outcome, colored)
        );
        if let Some(error) = &mapping.error {
            let _ = write!(out, "  ({error})");
        }
        out.push('\n');
    }
    for skipped in &report.skipped_subtrees {
        let _ = writeln!(out, "  subtree {} skipped: {}", skipped.path, skipped.error);
    }
    let failed = report
        .mappings
        .iter()
        .filter(|m| m.outcome == Outcome::Failed)
        .count();
    let _ = writeln!(
        out,
        "Mapped: {}  Failed: {}  Skipped subtrees: {}",
        report.mappings.len() - failed,
        failed,
        report.skipped_subtrees.len()
    );
    out
}

pub fn render_layout_report(report: &LayoutReport, colored: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Realm {}", report.realm);
    for step in &report.steps {
        resource_line(&mut out, step, colored);
    }
    out.push('\n');
    summary_line(&mut out, &report.summary());
    out
}
