//! lodestar - provision tenants in a search cluster and wire them to an
//! identity provider.
//!
//! Subcommands:
//! - `tenants` - lifecycle policy, template, bootstrap index, data view and roles per tenant
//! - `role-mappings` - map identity-provider groups onto search roles
//! - `idp-layout` - create the realm, groups and realm roles
//! - `doctor` - check configuration and connectivity

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use lodestar_cli::commands::{self, Context};
use lodestar_cli::config::AppConfig;
use lodestar_cli::error::CliResult;
use lodestar_cli::logging::{init_logging, LogFormat};

#[derive(Parser)]
#[command(name = "lodestar")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Print reports as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Log line format on stderr
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Tenants processed at once [env: RECONCILE_CONCURRENCY]
    #[arg(long, global = true, value_parser = clap::value_parser!(u16).range(1..))]
    concurrency: Option<u16>,

    /// Disable TLS certificate verification for every endpoint
    #[arg(long, global = true)]
    insecure: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create per-tenant search resources and grant the aggregated role
    Tenants(commands::tenants::TenantsArgs),

    /// Map identity-provider groups onto search roles
    RoleMappings(commands::role_mappings::RoleMappingsArgs),

    /// Create the identity-provider realm, groups and realm roles
    IdpLayout(commands::idp_layout::IdpLayoutArgs),

    /// Diagnose connection and configuration issues
    Doctor(commands::doctor::DoctorArgs),
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let mut config = AppConfig::from_env()?;
    init_logging(cli.log_format, &config.log_filter);

    if let Some(concurrency) = cli.concurrency {
        config.concurrency = usize::from(concurrency);
    }
    if cli.insecure {
        config.search.tls_verify = false;
        config.idp.tls_verify = false;
    }
    if !config.search.tls_verify || !config.idp.tls_verify {
        warn!("TLS certificate verification is disabled");
    }

    let ctx = Context::new(config, cli.json);
    let cancel = ctx.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, finishing in-flight work");
            cancel.cancel();
        }
    });

    match cli.command {
        Commands::Tenants(args) => commands::tenants::execute(args, &ctx).await,
        Commands::RoleMappings(args) => commands::role_mappings::execute(args, &ctx).await,
        Commands::IdpLayout(args) => commands::idp_layout::execute(args, &ctx).await,
        Commands::Doctor(args) => commands::doctor::execute(args, &ctx).await,
    }
}
