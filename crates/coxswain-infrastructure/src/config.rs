//! Tenant configuration.
//!
//! One TOML file describes every club the bot serves. The path is passed
//! in by the host; nothing here probes home directories.

use coxswain_core::error::{CoxswainError, Result};
use coxswain_core::policy::ReservationPolicy;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Root of the tenant configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigRoot {
    #[serde(rename = "tenant", default)]
    pub tenants: Vec<TenantConfig>,
}

/// One club's connection and policy settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TenantConfig {
    pub tenant_id: String,
    pub club_name: String,
    pub api: ApiCredentials,
    /// Scheduling-service login the bot acts as
    pub bot_user_name: String,
    #[serde(default)]
    pub policy: ReservationPolicy,
}

/// Scheduling-service endpoint and credentials for one club.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiCredentials {
    pub base_url: String,
    pub username: String,
    pub password: String,
}

/// Loads every tenant from the given TOML file.
pub fn load_tenant_configs(path: &Path) -> Result<Vec<TenantConfig>> {
    let content = fs::read_to_string(path).map_err(|e| {
        CoxswainError::config(format!(
            "failed to read tenant config at {}: {}",
            path.display(),
            e
        ))
    })?;
    let root: ConfigRoot = toml::from_str(&content).map_err(|e| CoxswainError::Serialization {
        format: "TOML".to_string(),
        message: e.to_string(),
    })?;
    if root.tenants.is_empty() {
        return Err(CoxswainError::config(format!(
            "no tenants defined in {}",
            path.display()
        )));
    }
    Ok(root.tenants)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[[tenant]]
tenant_id = "club-1"
club_name = "Harbor Rowing Club"
bot_user_name = "coxbot"

[tenant.api]
base_url = "https://sched.example/api"
username = "coxbot"
password = "hunter2"

[tenant.policy]
max_days_ahead = 7

[[tenant]]
tenant_id = "club-2"
club_name = "Lakeside Scullers"
bot_user_name = "coxbot"

[tenant.api]
base_url = "https://lakeside.example/api"
username = "coxbot"
password = "hunter3"
"#;

    #[test]
    fn test_load_tenants_with_policy_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let tenants = load_tenant_configs(file.path()).unwrap();
        assert_eq!(tenants.len(), 2);

        // Overridden field
        assert_eq!(tenants[0].policy.max_days_ahead, 7);
        // Everything else falls back to the defaults
        assert_eq!(tenants[0].policy.slot_minutes, 15);
        assert_eq!(tenants[1].policy.max_days_ahead, 14);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = load_tenant_configs(Path::new("/nonexistent/tenants.toml")).unwrap_err();
        assert!(matches!(err, CoxswainError::Config(_)));
    }

    #[test]
    fn test_empty_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"# no tenants\n").unwrap();
        let err = load_tenant_configs(file.path()).unwrap_err();
        assert!(matches!(err, CoxswainError::Config(_)));
    }
}
