//! Doctor command - Diagnose connection and configuration issues

use clap::Args;
use serde::Serialize;

use crate::commands::Context;
use crate::error::{CliError, CliResult};
use crate::output;

const RESET: &str = "\x1b[0m";

/// Arguments for the doctor command
#[derive(Args, Debug, Default)]
#[command(about = "Diagnose connection and configuration issues")]
pub struct DoctorArgs {
    /// Skip the identity-provider checks
    #[arg(long)]
    pub skip_idp: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticStatus {
    Pass,
    Warn,
    Fail,
    Skip,
}

impl DiagnosticStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            DiagnosticStatus::Pass => "✓",
            DiagnosticStatus::Warn => "!",
            DiagnosticStatus::Fail => "✗",
            DiagnosticStatus::Skip => "-",
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            DiagnosticStatus::Pass => "pass",
            DiagnosticStatus::Warn => "warn",
            DiagnosticStatus::Fail => "fail",
            DiagnosticStatus::Skip => "skip",
        }
    }

    fn color(&self) -> &'static str {
        match self {
            DiagnosticStatus::Pass => "\x1b[32m",
            DiagnosticStatus::Warn => "\x1b[33m",
            DiagnosticStatus::Fail => "\x1b[31m",
            DiagnosticStatus::Skip => "\x1b[90m",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticCheck {
    pub name: &'static str,
    pub display_name: &'static str,
    pub status: DiagnosticStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl DiagnosticCheck {
    pub fn pass(name: &'static str, display_name: &'static str, message: &str) -> Self {
        Self::new(name, display_name, DiagnosticStatus::Pass, message, None)
    }

    pub fn warn(
        name: &'static str,
        display_name: &'static str,
        message: &str,
        suggestion: Option<&str>,
    ) -> Self {
        Self::new(name, display_name, DiagnosticStatus::Warn, message, suggestion)
    }

    pub fn fail(
        name: &'static str,
        display_name: &'static str,
        message: &str,
        suggestion: &str,
    ) -> Self {
        Self::new(
            name,
            display_name,
            DiagnosticStatus::Fail,
            message,
            Some(suggestion),
        )
    }

    pub fn skip(name: &'static str, display_name: &'static str, message: &str) -> Self {
        Self::new(name, display_name, DiagnosticStatus::Skip, message, None)
    }

    fn new(
        name: &'static str,
        display_name: &'static str,
        status: DiagnosticStatus,
        message: &str,
        suggestion: Option<&str>,
    ) -> Self {
        Self {
            name,
            display_name,
            status,
            message: message.to_string(),
            suggestion: suggestion.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticReport {
    pub checks: Vec<DiagnosticCheck>,
    pub overall_status: DiagnosticStatus,
    pub version: &'static str,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl DiagnosticReport {
    pub fn new(checks: Vec<DiagnosticCheck>) -> Self {
        let status_of = |s: DiagnosticStatus| checks.iter().any(|c| c.status == s);
        let overall_status = if status_of(DiagnosticStatus::Fail) {
            DiagnosticStatus::Fail
        } else if status_of(DiagnosticStatus::Warn) {
            DiagnosticStatus::Warn
        } else if status_of(DiagnosticStatus::Pass) {
            DiagnosticStatus::Pass
        } else {
            DiagnosticStatus::Skip
        };
        Self {
            checks,
            overall_status,
            version: env!("CARGO_PKG_VERSION"),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn fail_count(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| c.status == DiagnosticStatus::Fail)
            .count()
    }
}

/// Check that the search connection can be built from configuration
fn check_configuration(ctx: &Context) -> DiagnosticCheck {
    match ctx.config.search_connection() {
        Ok(conn) => DiagnosticCheck::pass(
            "configuration",
            "Configuration",
            &format!("Search endpoint {} as {}", conn.base_url, conn.credentials.username),
        ),
        Err(e) => DiagnosticCheck::fail(
            "configuration",
            "Configuration",
            &e.to_string(),
            "Set the variable in the environment or the .env file",
        ),
    }
}

fn from_search_health(
    name: &'static str,
    display_name: &'static str,
    health: lodestar_search::HealthCheckResult,
) -> DiagnosticCheck {
    if health.healthy {
        let version = health
            .version
            .map(|v| format!(" (v{v})"))
            .unwrap_or_default();
        DiagnosticCheck::pass(name, display_name, &format!("Reachable{version}"))
    } else {
        DiagnosticCheck::fail(
            name,
            display_name,
            health.error.as_deref().unwrap_or("Unreachable"),
            "Check the host, the credentials and TLS settings",
        )
    }
}

async fn check_identity_provider(ctx: &Context) -> DiagnosticCheck {
    const NAME: &str = "identity_provider";
    const DISPLAY: &str = "Identity Provider";

    if ctx.config.idp.url.is_none() {
        return DiagnosticCheck::skip(NAME, DISPLAY, "Skipped - KEYCLOAK_URL not set");
    }
    let realm = match ctx.config.managed_realm() {
        Ok(realm) => realm,
        Err(e) => {
            return DiagnosticCheck::fail(NAME, DISPLAY, &e.to_string(), "Set KEYCLOAK_REALM")
        }
    };
    let client = match ctx.idp_client(realm.clone()) {
        Ok(client) => client,
        Err(e) => {
            return DiagnosticCheck::fail(
                NAME,
                DISPLAY,
                &e.to_string(),
                "Set admin user and password, or a client secret",
            )
        }
    };

    let health = client.health_check().await;
    match (health.healthy, health.realm_present) {
        (true, Some(false)) => DiagnosticCheck::warn(
            NAME,
            DISPLAY,
            &format!("Authenticated, but realm '{realm}' does not exist"),
            Some("Run `lodestar idp-layout` to create it"),
        ),
        (true, _) => DiagnosticCheck::pass(
            NAME,
            DISPLAY,
            &format!("Authenticated, realm '{realm}' present"),
        ),
        (false, _) => DiagnosticCheck::fail(
            NAME,
            DISPLAY,
            health.error.as_deref().unwrap_or("Unreachable"),
            "Check KEYCLOAK_URL and the admin credentials",
        ),
    }
}

/// Run all diagnostic checks
pub async fn run_all_checks(args: &DoctorArgs, ctx: &Context) -> DiagnosticReport {
    let mut checks = Vec::new();

    let config_check = check_configuration(ctx);
    let config_ok = config_check.status == DiagnosticStatus::Pass;
    checks.push(config_check);

    match ctx.search_client() {
        Ok(client) if config_ok => {
            checks.push(from_search_health(
                "search",
                "Search Engine",
                client.health_check().await,
            ));
            checks.push(from_search_health(
                "dashboard",
                "Dashboard",
                client.dashboard_health_check().await,
            ));
        }
        _ => {
            checks.push(DiagnosticCheck::skip(
                "search",
                "Search Engine",
                "Skipped - configuration failed",
            ));
            checks.push(DiagnosticCheck::skip(
                "dashboard",
                "Dashboard",
                "Skipped - configuration failed",
            ));
        }
    }

    if args.skip_idp {
        checks.push(DiagnosticCheck::skip(
            "identity_provider",
            "Identity Provider",
            "Skipped - --skip-idp",
        ));
    } else {
        checks.push(check_identity_provider(ctx).await);
    }

    DiagnosticReport::new(checks)
}

fn render_report(report: &DiagnosticReport, colored: bool) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    let _ = writeln!(out, "\nlodestar doctor\n");
    for check in &report.checks {
        let status = if colored {
            format!(
                "{}{} {}{RESET}",
                check.status.color(),
                check.status.symbol(),
                check.status.display()
            )
        } else {
            format!("{} {}", check.status.symbol(), check.status.display())
        };
        let _ = writeln!(
            out,
            "  {:<20} {:>8}    {}",
            check.display_name, status, check.message
        );
        if let Some(suggestion) = &check.suggestion {
            let _ = writeln!(out, "                              └─ {suggestion}");
        }
    }
    let overall = match report.overall_status {
        DiagnosticStatus::Pass => "All checks passed".to_string(),
        DiagnosticStatus::Fail => format!("{} check(s) failed", report.fail_count()),
        DiagnosticStatus::Warn => "Warnings detected".to_string(),
        DiagnosticStatus::Skip => "Checks skipped".to_string(),
    };
    let _ = writeln!(
        out,
        "\n  Overall Status: {} {overall}",
        report.overall_status.symbol()
    );
    let _ = writeln!(out, "  Checked at: {}", report.timestamp);
    out
}

/// Execute the doctor command
pub async fn execute(args: DoctorArgs, ctx: &Context) -> CliResult<()> {
    let report = run_all_checks(&args, ctx).await;

    if ctx.json {
        output::print_json(&report)?;
    } else {
        print!("{}", render_report(&report, output::use_color()));
    }

    if report.overall_status == DiagnosticStatus::Fail {
        return Err(CliError::Unhealthy(format!(
            "{} diagnostic check(s) failed",
            report.fail_count()
        )));
    }
    Ok(())
}
