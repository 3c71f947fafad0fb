//! CLI error types and exit codes

use lodestar_core::{BackendError, FailureKind, NamingError};
use lodestar_reconcile::ReconcileError;
use thiserror::Error;

use crate::config::ConfigError;

/// Exit codes for the CLI
/// - 0: Success (resource-level failures are reported, not fatal)
/// - 1: Configuration or input error, or an aborted run
/// - 2: Authentication failed
/// - 3: A backend failed its health check
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Run aborted: {0}")]
    Aborted(String),

    #[error("Unhealthy: {0}")]
    Unhealthy(String),

    #[error("Failed to write output: {0}")]
    Output(String),
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::Input(_) | CliError::Aborted(_) => 1,
            CliError::Output(_) => 1,
            CliError::AuthenticationFailed(_) => 2,
            CliError::Unhealthy(_) => 3,
        }
    }

    /// Print the error to stderr with appropriate formatting
    pub fn print(&self) {
        if std::env::var("NO_COLOR").is_err() {
            eprintln!("\x1b[31mError:\x1b[0m {self}");
        } else {
            eprintln!("Error: {self}");
        }
        if let Some(suggestion) = self.suggestion() {
            eprintln!("\nSuggestion: {suggestion}");
        }
    }

    fn suggestion(&self) -> Option<&'static str> {
        match self {
            CliError::Config(_) => Some("Check the environment variables or the .env file."),
            CliError::AuthenticationFailed(_) => {
                Some("Verify the credentials and that the account holds admin privileges.")
            }
            CliError::Unhealthy(_) => Some("Run 'lodestar doctor' for details."),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<NamingError> for CliError {
    fn from(e: NamingError) -> Self {
        CliError::Input(e.to_string())
    }
}

impl From<BackendError> for CliError {
    fn from(e: BackendError) -> Self {
        match e.kind() {
            FailureKind::Authentication => CliError::AuthenticationFailed(e.to_string()),
            FailureKind::Configuration => CliError::Config(e.to_string()),
            _ => CliError::Aborted(e.to_string()),
        }
    }
}

impl From<ReconcileError> for CliError {
    fn from(e: ReconcileError) -> Self {
        match e {
            ReconcileError::Aborted(backend) => backend.into(),
            other => CliError::Aborted(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Output(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lodestar_core::ResourceKind;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Config("x".into()).exit_code(), 1);
        assert_eq!(CliError::Input("x".into()).exit_code(), 1);
        assert_eq!(CliError::AuthenticationFailed("x".into()).exit_code(), 2);
        assert_eq!(CliError::Unhealthy("x".into()).exit_code(), 3);
    }

    #[test]
    fn test_fatal_backend_errors_map_to_exit_codes() {
        let auth: CliError = ReconcileError::Aborted(BackendError::authentication("401")).into();
        assert_eq!(auth.exit_code(), 2);

        let config: CliError = BackendError::configuration("no dashboard").into();
        assert!(matches!(config, CliError::Config(_)));
        assert_eq!(config.exit_code(), 1);

        let other: CliError = BackendError::not_found(ResourceKind::Role, "r").into();
        assert!(matches!(other, CliError::Aborted(_)));
    }

    #[test]
    fn test_config_error_conversion() {
        let err: CliError = ConfigError::MissingVar("ELK_PASSWORD".into()).into();
        assert!(err.to_string().contains("ELK_PASSWORD"));
        assert_eq!(err.exit_code(), 1);
    }
}
