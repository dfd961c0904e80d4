//! Configuration file with named server environments
//!
//! The file lets operators keep addresses and passwords out of their shell
//! history. Example:
//!
//! ```yaml
//! default:
//!   address: "127.0.0.1:16260"
//!   password: "password"
//! rust:
//!   address: "127.0.0.1:28016"
//!   password: "password"
//!   type: web
//!   log: "logs/rust.log"
//! ```

use crate::error::{ConfigError, RconError};
use crate::session::Protocol;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File looked up next to the executable when no path is given
pub const DEFAULT_CONFIG_NAME: &str = "rcon.yaml";

/// Environment used when none is selected
pub const DEFAULT_CONFIG_ENV: &str = "default";

/// One named group of connection settings. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    pub address: Option<String>,
    pub password: Option<String>,
    /// Request log file
    pub log: Option<String>,
    /// Protocol tag (`rcon`, `telnet` or `web`)
    #[serde(rename = "type")]
    pub protocol: Option<String>,
    pub skip_errors: Option<bool>,
    /// Timeout in seconds
    pub timeout: Option<u64>,
}

impl Environment {
    /// Parsed protocol tag; an empty tag counts as unset
    pub fn protocol(&self) -> Result<Option<Protocol>, RconError> {
        match self.protocol.as_deref() {
            None | Some("") => Ok(None),
            Some(tag) => tag.parse().map(Some),
        }
    }
}

/// Mapping from environment name to settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Config(BTreeMap<String, Environment>);

impl Default for Config {
    fn default() -> Self {
        let mut environments = BTreeMap::new();
        environments.insert(DEFAULT_CONFIG_ENV.to_string(), Environment::default());
        Self(environments)
    }
}

impl Config {
    /// Load the configuration.
    ///
    /// An explicit `path` must exist. Without one, `rcon.yaml` next to the
    /// executable is used if present and an empty default environment
    /// otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        let path = Self::default_path()?;
        match Self::from_file(&path) {
            Ok(config) => Ok(config),
            Err(e) if e.is_not_found() => {
                debug!("No config at {}, using empty default environment", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Read, parse and validate a config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let extension = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        debug!("Parsing config file {}", path.display());
        let config = Self::parse(&contents, &extension)?;
        config.validate()?;
        Ok(config)
    }

    /// `rcon.yaml` in the directory holding the running executable
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let exe = std::env::current_exe().map_err(ConfigError::Executable)?;
        let dir = exe.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(dir.join(DEFAULT_CONFIG_NAME))
    }

    /// Parse file contents according to the extension (including the dot)
    pub fn parse(contents: &str, extension: &str) -> Result<Self, ConfigError> {
        match extension {
            ".yaml" | ".yml" => Ok(serde_yaml::from_str(contents)?),
            ".json" => Ok(serde_json::from_str(contents)?),
            other => Err(ConfigError::UnsupportedExtension(other.to_string())),
        }
    }

    /// Reject environments with an unknown protocol tag
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, environment) in &self.0 {
            if environment.protocol().is_err() {
                return Err(ConfigError::Validation(format!(
                    "unsupported type in {} environment",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Look up an environment by name
    pub fn environment(&self, name: &str) -> Option<&Environment> {
        self.0.get(name)
    }

    /// Names of all environments
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl From<BTreeMap<String, Environment>> for Config {
    fn from(environments: BTreeMap<String, Environment>) -> Self {
        Self(environments)
    }
}
