//! # Configuration
//!
//! Optional TOML file holding defaults for the CLI and the server.
//!
//! ```toml
//! conditions = "conditions.redb"
//! run = 316000
//! default_bits = "ch-id-error,physics-bad-channel-error"
//! verbose = false
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! cors_origins = ["http://localhost:3000"]
//! refresh_secs = 60
//! ```
//!
//! Command-line flags override every value here.

use ecalmask_core::MaskError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file looked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "ecalmask.toml";

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origins allowed to query from a browser; `"*"` allows any.
    /// Empty means same-origin only.
    pub cors_origins: Vec<String>,
    /// Seconds between store reloads while serving with a run; unset disables.
    pub refresh_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_origins: Vec::new(),
            refresh_secs: None,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Conditions payload file or redb store.
    pub conditions: Option<PathBuf>,
    /// Run used to select an epoch from a store.
    pub run: Option<u64>,
    /// Mask bits used when a query gives none.
    pub default_bits: Option<String>,
    pub verbose: bool,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Parse a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, MaskError> {
        toml::from_str(text).map_err(|e| MaskError::ConfigError(format!("Invalid config: {}", e)))
    }

    /// Load the config at `path`.
    ///
    /// A missing file yields the defaults unless `required` is set.
    pub fn load(path: &Path, required: bool) -> Result<Self, MaskError> {
        if !path.exists() {
            if required {
                return Err(MaskError::ConfigError(format!(
                    "Config file '{}' not found",
                    path.display()
                )));
            }
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let metadata = std::fs::metadata(path)
            .map_err(|e| MaskError::IoError(format!("Cannot read config metadata: {}", e)))?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(MaskError::ConfigError(format!(
                "Config file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let text = std::fs::read_to_string(path)
            .map_err(|e| MaskError::IoError(format!("Read config: {}", e)))?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }
}
