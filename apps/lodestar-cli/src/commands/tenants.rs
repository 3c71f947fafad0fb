//! Tenants command - create each tenant's lifecycle policy, template,
//! bootstrap index, data view and roles, and grant the aggregated role.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use lodestar_core::naming::{parse_tenant_list, TenantName};
use lodestar_reconcile::{ReconcileOptions, RoleNaming, TenantReconciler};
use tracing::info;

use crate::commands::Context;
use crate::error::{CliError, CliResult};
use crate::output;

/// Arguments for the tenants command
#[derive(Args, Debug, Default)]
pub struct TenantsArgs {
    /// File listing tenant names, comma- or whitespace-separated [env: TENANT_FILE]
    #[arg(long, short = 'f')]
    pub file: Option<PathBuf>,

    /// Tenant name; repeatable, processed after the file's entries
    #[arg(long = "tenant", short = 't')]
    pub tenants: Vec<String>,

    /// Shared role that receives a read grant per tenant; "none" disables it
    #[arg(long)]
    pub aggregated_role: Option<String>,

    /// Name roles `{prefix}{tenant}{kind}` instead of `{tenant}-{kind}`
    #[arg(long)]
    pub role_prefix: Option<String>,
}

/// Read the tenant list from `file` plus inline names, in order, deduplicated.
///
/// A missing file is a configuration error; an empty list is not an error.
pub fn read_tenants(file: Option<&Path>, inline: &[String]) -> CliResult<Vec<TenantName>> {
    if file.is_none() && inline.is_empty() {
        return Err(CliError::Config(
            "no tenants given: pass --file or --tenant, or set TENANT_FILE".to_string(),
        ));
    }

    let mut raw = String::new();
    if let Some(path) = file {
        raw = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                CliError::Config(format!("tenant file '{}' not found", path.display()))
            }
            _ => CliError::Input(format!("cannot read '{}': {e}", path.display())),
        })?;
    }
    for name in inline {
        raw.push('\n');
        raw.push_str(name);
    }

    Ok(parse_tenant_list(&raw)?)
}

/// Execute the tenants command
pub async fn execute(args: TenantsArgs, ctx: &Context) -> CliResult<()> {
    let file = args.file.as_deref().or(ctx.config.tenant_file.as_deref());
    let tenants = read_tenants(file, &args.tenants)?;
    if tenants.is_empty() {
        info!("Tenant list is empty, nothing to reconcile");
        if !ctx.json {
            println!("No tenants to reconcile.");
        }
        return Ok(());
    }

    let aggregated_role = match args.aggregated_role {
        Some(role) if role.eq_ignore_ascii_case("none") => None,
        Some(role) => Some(role),
        None => ctx.config.aggregated_role.clone(),
    };
    let role_naming = match args.role_prefix {
        Some(prefix) => RoleNaming::GroupPrefixed(prefix),
        None => ctx.config.role_naming.clone(),
    };

    let client = Arc::new(ctx.search_client()?);
    let reconciler = TenantReconciler::new(
        client,
        ctx.config.defaults.clone(),
        ReconcileOptions {
            concurrency: ctx.config.concurrency,
            aggregated_role,
            role_naming,
        },
    )
    .with_cancellation(ctx.cancel.clone());

    let report = reconciler.reconcile(&tenants).await?;

    if ctx.json {
        output::print_json(&report)?;
    } else {
        print!("{}", output::render_run_report(&report, output::use_color()));
    }
    Ok(())
}
