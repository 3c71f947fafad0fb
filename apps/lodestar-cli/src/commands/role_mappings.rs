//! Role-mappings command - map identity-provider groups to search roles.

use std::sync::Arc;

use clap::{Args, ValueEnum};
use lodestar_reconcile::{MappingNaming, RoleMappingSync, SuffixFilter};
use tracing::warn;

use crate::commands::Context;
use crate::error::CliResult;
use crate::output;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum NamingArg {
    /// Role named after the group's last path segment
    #[default]
    Segment,
    /// Role named `{segment}-viewer`
    Viewer,
}

impl From<NamingArg> for MappingNaming {
    fn from(arg: NamingArg) -> Self {
        match arg {
            NamingArg::Segment => MappingNaming::LastSegment,
            NamingArg::Viewer => MappingNaming::ViewerSuffix,
        }
    }
}

/// Arguments for the role-mappings command
#[derive(Args, Debug, Default)]
pub struct RoleMappingsArgs {
    /// Group path prefix, e.g. `/kibana/` [env: TARGET_GROUP_PATH]
    #[arg(long)]
    pub prefix: Option<String>,

    /// Accepted group-name suffix; repeatable, first match wins [env: ROLE_SUFFIX]
    #[arg(long = "suffix", short = 's')]
    pub suffixes: Vec<String>,

    /// Realm whose groups are walked [env: KEYCLOAK_REALM]
    #[arg(long)]
    pub realm: Option<String>,

    /// Realm name matched by the mapping rule; defaults to the walked realm
    #[arg(long)]
    pub mapping_realm: Option<String>,

    /// How the mapped role is named
    #[arg(long, value_enum, default_value_t = NamingArg::Segment)]
    pub naming: NamingArg,
}

/// Execute the role-mappings command
pub async fn execute(args: RoleMappingsArgs, ctx: &Context) -> CliResult<()> {
    let realm = match args.realm {
        Some(realm) => realm,
        None => ctx.config.managed_realm()?,
    };
    let prefix = args
        .prefix
        .unwrap_or_else(|| ctx.config.target_group_path.clone());
    let suffixes = if args.suffixes.is_empty() {
        ctx.config.role_suffixes.clone()
    } else {
        args.suffixes
    };
    let filter = SuffixFilter::new(&prefix, suffixes);
    if filter.suffixes().is_empty() {
        warn!(prefix = %filter.prefix(), "No suffixes configured, every group under the prefix will be mapped");
    }

    let search = Arc::new(ctx.search_client()?);
    let idp = Arc::new(ctx.idp_client(realm.clone())?);
    let sync = RoleMappingSync::new(idp, search, args.mapping_realm.unwrap_or(realm))
        .with_naming(args.naming.into());

    let report = sync.sync_filtered(&filter).await?;

    if ctx.json {
        output::print_json(&report)?;
    } else {
        print!("{}", output::render_mapping_report(&report, output::use_color()));
    }
    Ok(())
}
