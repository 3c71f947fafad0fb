//! Idp-layout command - create the realm, group hierarchy and realm roles.

use std::sync::Arc;

use clap::Args;
use lodestar_reconcile::{IdpLayout, LayoutPlan};
use tracing::warn;

use crate::commands::Context;
use crate::error::{CliError, CliResult};
use crate::output;

/// Arguments for the idp-layout command
#[derive(Args, Debug, Default)]
pub struct IdpLayoutArgs {
    /// Realm to create and populate [env: NEW_REALM]
    #[arg(long)]
    pub realm: Option<String>,

    /// Top-level group; repeatable [env: GROUPS_TO_CREATE]
    #[arg(long = "group", short = 'g')]
    pub groups: Vec<String>,

    /// Subgroup created under every group; repeatable [env: SUBGROUPS]
    #[arg(long = "subgroup")]
    pub subgroups: Vec<String>,

    /// Leaf suffix; repeatable [env: ROLE_SUFFIX]
    #[arg(long = "suffix", short = 's')]
    pub suffixes: Vec<String>,
}

fn or_config(args: Vec<String>, config: &[String]) -> Vec<String> {
    if args.is_empty() {
        config.to_vec()
    } else {
        args
    }
}

/// Build the plan from arguments, falling back to configuration.
pub fn plan(args: IdpLayoutArgs, ctx: &Context) -> CliResult<LayoutPlan> {
    let config = &ctx.config;
    let realm = match args.realm {
        Some(realm) => realm,
        None => config.layout_realm()?,
    };
    let plan = LayoutPlan {
        realm,
        groups: or_config(args.groups, &config.layout.groups),
        subgroups: or_config(args.subgroups, &config.layout.subgroups),
        role_suffixes: or_config(args.suffixes, &config.role_suffixes),
    };
    if plan.groups.is_empty() {
        return Err(CliError::Config(
            "no groups to create: pass --group or set GROUPS_TO_CREATE".to_string(),
        ));
    }
    Ok(plan)
}

/// Execute the idp-layout command
pub async fn execute(args: IdpLayoutArgs, ctx: &Context) -> CliResult<()> {
    let plan = plan(args, ctx)?;
    if plan.subgroups.is_empty() || plan.role_suffixes.is_empty() {
        warn!(realm = %plan.realm, "No subgroups or suffixes configured, only top-level groups will be created");
    }

    let idp = Arc::new(ctx.idp_client(plan.realm.clone())?);
    let report = IdpLayout::new(idp).apply(&plan).await?;

    if ctx.json {
        output::print_json(&report)?;
    } else {
        print!("{}", output::render_layout_report(&report, output::use_color()));
    }
    Ok(())
}
