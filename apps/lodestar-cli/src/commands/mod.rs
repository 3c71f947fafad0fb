//! Subcommand implementations.

pub mod doctor;
pub mod idp_layout;
pub mod role_mappings;
pub mod tenants;

use lodestar_idp::IdpClient;
use lodestar_search::SearchClient;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::error::{CliError, CliResult};

/// State shared by every command.
pub struct Context {
    pub config: AppConfig,
    pub json: bool,
    pub cancel: CancellationToken,
}

impl Context {
    pub fn new(config: AppConfig, json: bool) -> Self {
        Self {
            config,
            json,
            cancel: CancellationToken::new(),
        }
    }

    pub fn search_client(&self) -> CliResult<SearchClient> {
        let connection = self.config.search_connection()?;
        SearchClient::new(connection).map_err(|e| CliError::Config(e.to_string()))
    }

    /// Client for the identity provider managing `realm`.
    pub fn idp_client(&self, realm: String) -> CliResult<IdpClient> {
        let connection = self.config.idp_connection(realm)?;
        IdpClient::new(connection).map_err(|e| CliError::Config(e.to_string()))
    }
}
