//! Configuration types and parsing for gantry.yml

use crate::error::CoreResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Engine policy configuration from gantry.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Whether deploy groups are in use. When off, a stage's production
    /// classification falls back to its own flag regardless of group
    /// associations.
    #[serde(default = "default_true")]
    pub deploy_groups_enabled: bool,

    /// Whether warning (soft) locks may be bypassed by other users when
    /// creating a deploy. Hard locks are never bypassed.
    #[serde(default = "default_true")]
    pub warning_lock_bypass: bool,

    /// Default lock lifetime in minutes for acquisitions that do not pass
    /// an explicit expiry. `None` means locks live until released.
    #[serde(default)]
    pub default_lock_ttl_minutes: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            deploy_groups_enabled: true,
            warning_lock_bypass: true,
            default_lock_ttl_minutes: None,
        }
    }
}

impl Config {
    /// Parse a config from YAML text.
    pub fn from_yaml(yaml: &str) -> CoreResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a config from a YAML file.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.deploy_groups_enabled);
        assert!(config.warning_lock_bypass);
        assert!(config.default_lock_ttl_minutes.is_none());
    }

    #[test]
    fn test_from_yaml() {
        let config = Config::from_yaml(
            "deploy_groups_enabled: false\nwarning_lock_bypass: false\ndefault_lock_ttl_minutes: 60\n",
        )
        .unwrap();
        assert!(!config.deploy_groups_enabled);
        assert!(!config.warning_lock_bypass);
        assert_eq!(config.default_lock_ttl_minutes, Some(60));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = Config::from_yaml("deploy_groups_enabled: false\n").unwrap();
        assert!(!config.deploy_groups_enabled);
        assert!(config.warning_lock_bypass);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        assert!(Config::from_yaml("bogus_field: true\n").is_err());
    }
}
