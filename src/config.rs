//! Bank portal configuration management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the backend base URL
pub const BASE_URL_ENV: &str = "BANKPORTAL_API_BASE_URL";

/// Main bank portal configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Backend API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Session lifecycle configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Persisted session storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

impl PortalConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Origin the relative `/api` prefix is resolved against
    pub origin: String,

    /// Full base URL override (takes precedence over `origin`)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost".to_string(),
            base_url: None,
            timeout_secs: 10,
        }
    }
}

impl ApiConfig {
    /// Base URL every endpoint path is appended to, without trailing slash
    pub fn resolved_base_url(&self) -> String {
        match self.base_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.trim_end_matches('/').to_string(),
            _ => format!("{}/api", self.origin.trim_end_matches('/')),
        }
    }

    /// Request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Session lifecycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Period of the background credential re-validation, in seconds
    pub validation_interval_secs: u64,

    /// A credential expiring sooner than this is treated as unusable
    pub expiry_margin_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            validation_interval_secs: 300,
            expiry_margin_secs: 300,
        }
    }
}

impl SessionConfig {
    pub fn validation_interval(&self) -> Duration {
        Duration::from_secs(self.validation_interval_secs)
    }

    pub fn expiry_margin(&self) -> Duration {
        Duration::from_secs(self.expiry_margin_secs)
    }
}

/// Persisted session storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// File holding the persisted credential and profile
    pub session_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let base = dirs_next::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bankportal");

        Self {
            session_file: base.join("session.json"),
        }
    }
}
