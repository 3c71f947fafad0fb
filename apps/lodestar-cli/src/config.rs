//! Configuration loaded from environment variables.
//!
//! Everything is read once into an [`AppConfig`] and passed down. Backend
//! credentials are only required by the commands that talk to that backend,
//! so a missing identity-provider password does not block a tenant run.

use std::env::VarError;
use std::path::PathBuf;
use std::time::Duration;

use lodestar_core::RetryPolicy;
use lodestar_idp::{IdpConnection, IdpCredentials};
use lodestar_reconcile::{ProvisioningDefaults, RoleNaming, SuffixFilter};
use lodestar_search::{BasicCredentials, SearchConnection};
use thiserror::Error;

pub const DEFAULT_LOG_FILTER: &str = "info,lodestar=debug";

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },
}

/// Search engine and dashboard connection settings.
#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub host: String,
    pub dashboard_host: String,
    pub username: String,
    pub password: Option<String>,
    pub tls_verify: bool,
}

/// Identity-provider connection settings.
#[derive(Debug, Clone)]
pub struct IdpSettings {
    pub url: Option<String>,
    pub master_realm: String,
    pub realm: Option<String>,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub admin_user: Option<String>,
    pub admin_password: Option<String>,
    pub tls_verify: bool,
}

/// Identity-provider layout inputs.
#[derive(Debug, Clone, Default)]
pub struct LayoutSettings {
    /// Realm to create; falls back to the managed realm.
    pub realm: Option<String>,
    pub groups: Vec<String>,
    pub subgroups: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub search: SearchSettings,
    pub idp: IdpSettings,
    pub layout: LayoutSettings,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub concurrency: usize,
    /// `None` disables the aggregated-role grant.
    pub aggregated_role: Option<String>,
    pub role_naming: RoleNaming,
    pub tenant_file: Option<PathBuf>,
    pub target_group_path: String,
    pub role_suffixes: Vec<String>,
    pub defaults: ProvisioningDefaults,
    pub log_filter: String,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Load configuration from a custom variable reader.
    ///
    /// Lets tests supply variables without touching the process environment.
    pub fn from_reader<F>(reader: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let optional = |key: &str| {
            reader(key)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let with_default = |key: &str, default: &str| {
            optional(key).unwrap_or_else(|| default.to_string())
        };
        let list = |key: &str| {
            optional(key)
                .map(|raw| SuffixFilter::parse_suffixes(&raw))
                .unwrap_or_default()
        };

        let search = SearchSettings {
            host: with_default("ES_HOST", "https://localhost:9200"),
            dashboard_host: with_default("KIBANA_HOST", "http://localhost:5601"),
            username: with_default("ELK_USERNAME", "elastic"),
            password: optional("ELK_PASSWORD"),
            tls_verify: parse_bool("ES_TLS_VERIFY", optional("ES_TLS_VERIFY"), true)?,
        };

        let idp = IdpSettings {
            url: optional("KEYCLOAK_URL"),
            master_realm: with_default("KEYCLOAK_MASTER_REALM", "master"),
            realm: optional("KEYCLOAK_REALM"),
            client_id: with_default("KEYCLOAK_CLIENT_ID", "admin-cli"),
            client_secret: optional("KEYCLOAK_CLIENT_SECRET"),
            admin_user: optional("KEYCLOAK_ADMIN_USER"),
            admin_password: optional("KEYCLOAK_ADMIN_PASSWORD"),
            tls_verify: parse_bool("KEYCLOAK_TLS_VERIFY", optional("KEYCLOAK_TLS_VERIFY"), true)?,
        };

        let layout = LayoutSettings {
            realm: optional("NEW_REALM"),
            groups: list("GROUPS_TO_CREATE"),
            subgroups: list("SUBGROUPS"),
        };

        let request_timeout = Duration::from_secs(parse_number(
            "REQUEST_TIMEOUT_SECS",
            optional("REQUEST_TIMEOUT_SECS"),
            30,
        )?);
        let max_retries = parse_number("MAX_RETRIES", optional("MAX_RETRIES"), 3)?;
        let concurrency: usize =
            parse_number("RECONCILE_CONCURRENCY", optional("RECONCILE_CONCURRENCY"), 1)?;
        if concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                var: "RECONCILE_CONCURRENCY".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        let aggregated_role = match optional("AGGREGATED_ROLE") {
            Some(role) if role.eq_ignore_ascii_case("none") => None,
            Some(role) => Some(role),
            None => Some("teamlead-viewer".to_string()),
        };

        let role_naming = match optional("ROLE_NAME_PREFIX") {
            Some(prefix) => RoleNaming::GroupPrefixed(prefix),
            None => RoleNaming::Dashed,
        };

        let mut defaults = ProvisioningDefaults::default();
        if let Some(v) = optional("ILM_ROLLOVER_MAX_AGE") {
            defaults.rollover_max_age = v;
        }
        if let Some(v) = optional("ILM_ROLLOVER_MAX_SHARD_SIZE") {
            defaults.rollover_max_primary_shard_size = v;
        }
        if let Some(v) = optional("ILM_DELETE_MIN_AGE") {
            defaults.delete_min_age = v;
        }

        Ok(Self {
            search,
            idp,
            layout,
            request_timeout,
            max_retries,
            concurrency,
            aggregated_role,
            role_naming,
            tenant_file: optional("TENANT_FILE").map(PathBuf::from),
            target_group_path: with_default("TARGET_GROUP_PATH", "kibana"),
            role_suffixes: list("ROLE_SUFFIX"),
            defaults,
            log_filter: with_default("RUST_LOG", DEFAULT_LOG_FILTER),
        })
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            ..RetryPolicy::default()
        }
    }

    /// Connection parameters for the search engine; requires `ELK_PASSWORD`.
    pub fn search_connection(&self) -> Result<SearchConnection, ConfigError> {
        let password = self
            .search
            .password
            .clone()
            .ok_or_else(|| ConfigError::MissingVar("ELK_PASSWORD".to_string()))?;
        Ok(SearchConnection {
            base_url: self.search.host.clone(),
            dashboard_url: Some(self.search.dashboard_host.clone()),
            credentials: BasicCredentials::new(self.search.username.clone(), password),
            timeout: self.request_timeout,
            tls_verify: self.search.tls_verify,
            retry: self.retry_policy(),
        })
    }

    /// Realm whose groups and roles are managed.
    pub fn managed_realm(&self) -> Result<String, ConfigError> {
        self.idp
            .realm
            .clone()
            .ok_or_else(|| ConfigError::MissingVar("KEYCLOAK_REALM".to_string()))
    }

    /// Realm the layout command builds: `NEW_REALM`, else `KEYCLOAK_REALM`.
    pub fn layout_realm(&self) -> Result<String, ConfigError> {
        match &self.layout.realm {
            Some(realm) => Ok(realm.clone()),
            None => self
                .managed_realm()
                .map_err(|_| ConfigError::MissingVar("NEW_REALM".to_string())),
        }
    }

    /// Admin credentials: the password grant when an admin user is set,
    /// client credentials otherwise.
    pub fn idp_credentials(&self) -> Result<IdpCredentials, ConfigError> {
        match (&self.idp.admin_user, &self.idp.admin_password) {
            (Some(username), Some(password)) => Ok(IdpCredentials::Password {
                username: username.clone(),
                password: password.clone(),
                client_id: self.idp.client_id.clone(),
                client_secret: self.idp.client_secret.clone(),
            }),
            (Some(_), None) => Err(ConfigError::MissingVar(
                "KEYCLOAK_ADMIN_PASSWORD".to_string(),
            )),
            (None, _) => match &self.idp.client_secret {
                Some(secret) => Ok(IdpCredentials::ClientCredentials {
                    client_id: self.idp.client_id.clone(),
                    client_secret: secret.clone(),
                }),
                None => Err(ConfigError::MissingVar("KEYCLOAK_ADMIN_USER".to_string())),
            },
        }
    }

    /// Connection parameters for the identity provider managing `realm`.
    pub fn idp_connection(&self, realm: String) -> Result<IdpConnection, ConfigError> {
        let base_url = self
            .idp
            .url
            .clone()
            .ok_or_else(|| ConfigError::MissingVar("KEYCLOAK_URL".to_string()))?;
        Ok(IdpConnection {
            base_url,
            master_realm: self.idp.master_realm.clone(),
            realm,
            credentials: self.idp_credentials()?,
            timeout: self.request_timeout,
            tls_verify: self.idp.tls_verify,
            retry: self.retry_policy(),
        })
    }
}

fn parse_bool(var: &str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("true" | "1" | "yes") => Ok(true),
        Some("false" | "0" | "no") => Ok(false),
        Some(other) => Err(ConfigError::InvalidValue {
            var: var.to_string(),
            message: format!("expected a boolean, got '{other}'"),
        }),
    }
}

fn parse_number<T>(var: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            var: var.to_string(),
            message: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Create a reader closure from a HashMap (no global env mutation).
    fn make_reader(vars: HashMap<&str, &str>) -> impl Fn(&str) -> Result<String, VarError> {
        let owned: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| owned.get(key).cloned().ok_or(VarError::NotPresent)
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_reader(make_reader(HashMap::new())).unwrap();
        assert_eq!(config.search.host, "https://localhost:9200");
        assert_eq!(config.search.username, "elastic");
        assert!(config.search.tls_verify);
        assert!(config.idp.tls_verify);
        assert_eq!(config.idp.master_realm, "master");
        assert_eq!(config.idp.client_id, "admin-cli");
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.aggregated_role.as_deref(), Some("teamlead-viewer"));
        assert_eq!(config.role_naming, RoleNaming::Dashed);
        assert_eq!(config.target_group_path, "kibana");
        assert!(config.role_suffixes.is_empty());
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_missing_password_is_reported_on_use() {
        let config = AppConfig::from_reader(make_reader(HashMap::new())).unwrap();
        let err = config.search_connection().unwrap_err();
        assert_eq!(err, ConfigError::MissingVar("ELK_PASSWORD".to_string()));
    }

    #[test]
    fn test_search_connection() {
        let config = AppConfig::from_reader(make_reader(HashMap::from([
            ("ES_HOST", "https://es:9200"),
            ("KIBANA_HOST", "https://kb:5601"),
            ("ELK_PASSWORD", "secret"),
            ("ES_TLS_VERIFY", "false"),
            ("MAX_RETRIES", "5"),
        ])))
        .unwrap();

        let connection = config.search_connection().unwrap();
        assert_eq!(connection.base_url, "https://es:9200");
        assert_eq!(connection.dashboard_url.as_deref(), Some("https://kb:5601"));
        assert!(!connection.tls_verify);
        assert_eq!(connection.retry.max_retries, 5);
    }

    #[test]
    fn test_idp_password_grant() {
        let config = AppConfig::from_reader(make_reader(HashMap::from([
            ("KEYCLOAK_URL", "https://kc"),
            ("KEYCLOAK_REALM", "elk"),
            ("KEYCLOAK_ADMIN_USER", "admin"),
            ("KEYCLOAK_ADMIN_PASSWORD", "pw"),
        ])))
        .unwrap();

        let connection = config.idp_connection(config.managed_realm().unwrap()).unwrap();
        assert_eq!(connection.realm, "elk");
        assert!(matches!(
            connection.credentials,
            IdpCredentials::Password { ref username, .. } if username == "admin"
        ));
    }

    #[test]
    fn test_idp_client_credentials() {
        let config = AppConfig::from_reader(make_reader(HashMap::from([
            ("KEYCLOAK_URL", "https://kc"),
            ("KEYCLOAK_CLIENT_ID", "provisioner"),
            ("KEYCLOAK_CLIENT_SECRET", "s3cret"),
        ])))
        .unwrap();

        assert!(matches!(
            config.idp_credentials().unwrap(),
            IdpCredentials::ClientCredentials { ref client_id, .. } if client_id == "provisioner"
        ));
    }

    #[test]
    fn test_idp_requires_url_and_credentials() {
        let config = AppConfig::from_reader(make_reader(HashMap::new())).unwrap();
        assert_eq!(
            config.idp_connection("elk".into()).unwrap_err(),
            ConfigError::MissingVar("KEYCLOAK_URL".to_string())
        );

        let config = AppConfig::from_reader(make_reader(HashMap::from([(
            "KEYCLOAK_ADMIN_USER",
            "admin",
        )])))
        .unwrap();
        assert_eq!(
            config.idp_credentials().unwrap_err(),
            ConfigError::MissingVar("KEYCLOAK_ADMIN_PASSWORD".to_string())
        );
    }

    #[test]
    fn test_layout_realm_falls_back_to_managed_realm() {
        let config = AppConfig::from_reader(make_reader(HashMap::from([
            ("KEYCLOAK_REALM", "elk"),
            ("GROUPS_TO_CREATE", "kibana grafana"),
            ("SUBGROUPS", "billing,ops"),
        ])))
        .unwrap();
        assert_eq!(config.layout_realm().unwrap(), "elk");
        assert_eq!(config.layout.groups, vec!["kibana", "grafana"]);
        assert_eq!(config.layout.subgroups, vec!["billing", "ops"]);

        let config = AppConfig::from_reader(make_reader(HashMap::new())).unwrap();
        assert_eq!(
            config.layout_realm().unwrap_err(),
            ConfigError::MissingVar("NEW_REALM".to_string())
        );
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_reader(make_reader(HashMap::from([
            ("AGGREGATED_ROLE", "none"),
            ("ROLE_NAME_PREFIX", "kibana"),
            ("ROLE_SUFFIX", "admin viewer"),
            ("ILM_ROLLOVER_MAX_SHARD_SIZE", "1gb"),
            ("ILM_DELETE_MIN_AGE", "30d"),
            ("RECONCILE_CONCURRENCY", "4"),
        ])))
        .unwrap();
        assert_eq!(config.aggregated_role, None);
        assert_eq!(config.role_naming, RoleNaming::GroupPrefixed("kibana".into()));
        assert_eq!(config.role_suffixes, vec!["admin", "viewer"]);
        assert_eq!(config.defaults.rollover_max_primary_shard_size, "1gb");
        assert_eq!(config.defaults.delete_min_age, "30d");
        assert_eq!(config.defaults.rollover_max_age, "1d");
        assert_eq!(config.concurrency, 4);
    }

    #[test]
    fn test_invalid_values() {
        let err = AppConfig::from_reader(make_reader(HashMap::from([(
            "RECONCILE_CONCURRENCY",
            "0",
        )])))
        .unwrap_err();
        assert!(err.to_string().contains("RECONCILE_CONCURRENCY"));

        let err = AppConfig::from_reader(make_reader(HashMap::from([(
            "ES_TLS_VERIFY",
            "maybe",
        )])))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref var, .. } if var == "ES_TLS_VERIFY"));

        let err = AppConfig::from_reader(make_reader(HashMap::from([(
            "REQUEST_TIMEOUT_SECS",
            "soon",
        )])))
        .unwrap_err();
        assert!(err.to_string().contains("REQUEST_TIMEOUT_SECS"));
    }
}
