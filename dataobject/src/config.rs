//! Runtime configuration, read from a TOML file.
//!
//! ```toml
//! [[namespaces]]
//! id = "crm"
//! order = 10.0
//!
//! [codec]
//! pretty = true
//!
//! [registry]
//! ambiguous_replacements = "warn"
//! ```

use crate::error::Result;
use crate::namespace::{Namespace, Namespaces};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// How the registry treats a base type with more than one replacement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmbiguityPolicy {
    /// Refuse to build the registry.
    #[default]
    Fail,
    /// Build it, and let `from_type_name` warn and return `None` for the tag.
    Warn,
}

/// Attribute keys and formatting used by the JSON codec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecConfig {
    #[serde(default = "default_type_name_key")]
    pub type_name_key: String,
    #[serde(default = "default_type_version_key")]
    pub type_version_key: String,
    #[serde(default = "default_contributions_key")]
    pub contributions_key: String,
    #[serde(default)]
    pub pretty: bool,
}

fn default_type_name_key() -> String {
    "_type".to_string()
}

fn default_type_version_key() -> String {
    "_typeVersion".to_string()
}

fn default_contributions_key() -> String {
    "_contributions".to_string()
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            type_name_key: default_type_name_key(),
            type_version_key: default_type_version_key(),
            contributions_key: default_contributions_key(),
            pretty: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub ambiguous_replacements: AmbiguityPolicy,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub namespaces: Vec<Namespace>,
    #[serde(default)]
    pub codec: CodecConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
}

impl Config {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Reads and parses a config file, failing on any error.
    pub fn read_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Loads a config file. A missing file yields the defaults; an unreadable
    /// or unparsable one yields the defaults with a warning.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!(path = %path.display(), "no data object config found, using defaults");
            return Self::default();
        }
        match Self::read_from(path) {
            Ok(config) => {
                info!(path = %path.display(), "loaded data object config");
                config
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to load data object config, falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// The namespace directory declared by this config.
    pub fn namespaces(&self) -> Result<Namespaces> {
        Namespaces::new(self.namespaces.iter().cloned())
    }
}
