//! Run configuration: initial pools per profile and engine-wide settings.
//!
//! ```yaml
//! seed: 42
//! non_runtime_resources: [user]
//! profiles:
//!   admin:
//!     username: admin@example.com
//!     resources:
//!       user: [admin@example.com]
//!       category: [1, 2, 3]
//! ```

use crate::pool::ResourcePool;
use schema_core::ResourceValue;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// One user profile: its seed resources and free-form metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileDefinition {
    /// Initial pool contents keyed by resource name
    #[serde(default)]
    pub resources: BTreeMap<String, Vec<ResourceValue>>,

    /// Anything else attached to the profile (credentials, labels, ...)
    #[serde(flatten)]
    pub metadata: BTreeMap<String, serde_yaml::Value>,
}

/// Engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Base seed for every provider's RNG; entropy when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Resources whose pools are never grown from responses
    #[serde(default)]
    pub non_runtime_resources: BTreeSet<String>,

    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileDefinition>,
}

impl EngineConfig {
    /// Load from a file; `.json` files are parsed as JSON, anything else as YAML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(name) = self.profiles.keys().find(|name| name.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "profile name cannot be blank: '{name}'"
            )));
        }
        Ok(())
    }

    /// Profile names in a stable order.
    pub fn profile_names(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }

    /// Merge every profile's initial resources into `pool`.
    pub fn seed_pool(&self, pool: &ResourcePool) {
        for (profile, definition) in &self.profiles {
            for (resource, values) in &definition.resources {
                let added = pool.merge(profile, resource, values.iter().cloned());
                debug!(profile, resource, added, "Seeded resource pool");
            }
        }
    }
}
