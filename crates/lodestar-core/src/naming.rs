//! Tenant validation and derived resource names.
//!
//! Every name is a pure function of a validated [`TenantName`] and a fixed
//! suffix, so two distinct tenants never collide on a resource name.

use crate::resource::RoleKind;
use serde::Serialize;
use thiserror::Error;

/// Name of the first index created behind a rollover alias.
pub const BOOTSTRAP_INDEX_GENERATION: &str = "000001";

/// Characters the search engine refuses in index names.
const FORBIDDEN_CHARS: &[char] = &['\\', '/', '*', '?', '"', '<', '>', '|', ',', '#', ':'];

/// Tenant validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NamingError {
    #[error("tenant name is empty")]
    Empty,

    #[error("tenant name '{tenant}' contains forbidden character '{ch}'")]
    ForbiddenCharacter { tenant: String, ch: char },

    #[error("tenant name '{0}' must be lowercase")]
    Uppercase(String),

    #[error("tenant name '{0}' must not start with '-', '_' or '+'")]
    LeadingCharacter(String),
}

/// A validated tenant identifier.
///
/// Trimmed, non-empty, lowercase and free of whitespace and the characters
/// the search engine rejects in index names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TenantName(String);

impl TenantName {
    /// Validate a raw tenant identifier.
    pub fn parse(raw: &str) -> Result<Self, NamingError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(NamingError::Empty);
        }
        if let Some(ch) = trimmed
            .chars()
            .find(|c| c.is_whitespace() || FORBIDDEN_CHARS.contains(c))
        {
            return Err(NamingError::ForbiddenCharacter {
                tenant: trimmed.to_string(),
                ch,
            });
        }
        if trimmed.chars().any(char::is_uppercase) {
            return Err(NamingError::Uppercase(trimmed.to_string()));
        }
        if trimmed.starts_with(['-', '_', '+']) {
            return Err(NamingError::LeadingCharacter(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TenantName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Parse a comma- or whitespace-separated tenant list.
///
/// Blank entries are skipped and duplicates are dropped (first occurrence
/// wins), so the result is ordered and unique.
pub fn parse_tenant_list(raw: &str) -> Result<Vec<TenantName>, NamingError> {
    let mut tenants: Vec<TenantName> = Vec::new();
    for entry in raw.split(|c: char| c == ',' || c.is_whitespace()) {
        if entry.trim().is_empty() {
            continue;
        }
        let tenant = TenantName::parse(entry)?;
        if !tenants.contains(&tenant) {
            tenants.push(tenant);
        }
    }
    Ok(tenants)
}

#[must_use]
pub fn policy_name(tenant: &TenantName) -> String {
    format!("{tenant}-policy")
}

#[must_use]
pub fn template_name(tenant: &TenantName) -> String {
    format!("{tenant}-template")
}

/// Rollover alias pointing at the tenant's write index.
#[must_use]
pub fn alias_name(tenant: &TenantName) -> String {
    format!("{tenant}_logs")
}

#[must_use]
pub fn bootstrap_index_name(tenant: &TenantName) -> String {
    format!("{tenant}-{BOOTSTRAP_INDEX_GENERATION}")
}

/// Index pattern covering every index of the tenant.
#[must_use]
pub fn index_pattern(tenant: &TenantName) -> String {
    format!("{tenant}-*")
}

/// Pattern granted to roles scoped to the tenant.
#[must_use]
pub fn group_role_pattern(tenant: &TenantName) -> String {
    index_pattern(tenant)
}

#[must_use]
pub fn role_name(tenant: &TenantName, kind: RoleKind) -> String {
    format!("{tenant}-{kind}")
}

/// Role name for deployments that key roles by an identity-provider group
/// prefix: `{prefix}{tenant}{kind}`, e.g. `kibanabillingread`.
///
/// Matches the realm-role names the layout provisioner creates as
/// `{group}{subgroup}{suffix}`.
#[must_use]
pub fn prefixed_role_name(prefix: &str, tenant: &TenantName, kind: RoleKind) -> String {
    format!("{}{tenant}{kind}", prefix.trim().trim_matches('/'))
}

/// Role-mapping name derived from a group path: its last segment.
///
/// ```
/// assert_eq!(lodestar_core::naming::role_mapping_name("/kibana/teamadmin"), "teamadmin");
/// ```
#[must_use]
pub fn role_mapping_name(group_path: &str) -> String {
    crate::group::last_segment(group_path).to_string()
}

/// Saved dashboard object id for the tenant's data view.
#[must_use]
pub fn data_view_id(tenant: &TenantName) -> String {
    tenant.as_str().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant(raw: &str) -> TenantName {
        TenantName::parse(raw).unwrap()
    }

    #[test]
    fn test_parse_trims() {
        assert_eq!(tenant("  billing \n").as_str(), "billing");
    }

    #[test]
    fn test_parse_rejects_blank() {
        assert_eq!(TenantName::parse("   "), Err(NamingError::Empty));
        assert_eq!(TenantName::parse(""), Err(NamingError::Empty));
    }

    #[test]
    fn test_parse_rejects_forbidden_characters() {
        assert!(matches!(
            TenantName::parse("bill ing"),
            Err(NamingError::ForbiddenCharacter { ch: ' ', .. })
        ));
        assert!(matches!(
            TenantName::parse("a/b"),
            Err(NamingError::ForbiddenCharacter { ch: '/', .. })
        ));
        assert!(matches!(
            TenantName::parse("a*"),
            Err(NamingError::ForbiddenCharacter { ch: '*', .. })
        ));
    }

    #[test]
    fn test_parse_rejects_uppercase_and_leading() {
        assert_eq!(
            TenantName::parse("Billing"),
            Err(NamingError::Uppercase("Billing".into()))
        );
        assert_eq!(
            TenantName::parse("-billing"),
            Err(NamingError::LeadingCharacter("-billing".into()))
        );
    }

    #[test]
    fn test_names_for_billing() {
        let t = tenant("billing");
        assert_eq!(policy_name(&t), "billing-policy");
        assert_eq!(template_name(&t), "billing-template");
        assert_eq!(alias_name(&t), "billing_logs");
        assert_eq!(bootstrap_index_name(&t), "billing-000001");
        assert_eq!(index_pattern(&t), "billing-*");
        assert_eq!(group_role_pattern(&t), "billing-*");
        assert_eq!(role_name(&t, RoleKind::Read), "billing-read");
        assert_eq!(role_name(&t, RoleKind::Admin), "billing-admin");
        assert_eq!(role_name(&t, RoleKind::Viewer), "billing-viewer");
        assert_eq!(data_view_id(&t), "billing");
    }

    #[test]
    fn test_prefixed_role_name() {
        let t = tenant("billing");
        assert_eq!(prefixed_role_name("/kibana/", &t, RoleKind::Read), "kibanabillingread");
        assert_eq!(prefixed_role_name("", &t, RoleKind::Admin), "billingadmin");
    }

    #[test]
    fn test_role_mapping_name_is_last_segment() {
        assert_eq!(role_mapping_name("/kibana/teamadmin"), "teamadmin");
        assert_eq!(role_mapping_name("/kibana/teamadmin/"), "teamadmin");
    }

    #[test]
    fn test_template_names_never_collide() {
        let names = ["a", "b", "a-b", "ab", "a-template", "billing", "billing-x"];
        let mut seen = std::collections::HashSet::new();
        for raw in names {
            let t = tenant(raw);
            assert_eq!(template_name(&t), format!("{raw}-template"));
            assert!(seen.insert(template_name(&t)), "collision for {raw}");
        }
    }

    #[test]
    fn test_parse_tenant_list_mixed_separators() {
        let tenants = parse_tenant_list("billing, orders\npayments  audit,,").unwrap();
        let names: Vec<&str> = tenants.iter().map(TenantName::as_str).collect();
        assert_eq!(names, vec!["billing", "orders", "payments", "audit"]);
    }

    #[test]
    fn test_parse_tenant_list_dedupes_in_order() {
        let tenants = parse_tenant_list("b,a,b,c,a").unwrap();
        let names: Vec<&str> = tenants.iter().map(TenantName::as_str).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_parse_tenant_list_empty() {
        assert!(parse_tenant_list("  \n , ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_tenant_list_rejects_invalid_entry() {
        assert!(parse_tenant_list("billing,Orders").is_err());
    }
}
