//! Application configuration management.
//!
//! `Config` is the persisted user configuration, stored at
//! `~/.config/deskboard/config.json`. `AuthConfig` is the slice of it the
//! session subsystem needs, with the endpoint layout filled in.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::{FileStore, KeyValueStore, KeyringStore};

/// Application name used for config/data directory paths
const APP_NAME: &str = "deskboard";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// File backing `StorageBackend::File`
const CREDENTIALS_FILE: &str = "credentials.json";

const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";
const DEFAULT_ISSUER: &str = "deskboard-api";
const DEFAULT_AUDIENCE: &str = "deskboard-client";

/// Everything the session subsystem needs to know about the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Expected `iss` claim.
    pub issuer: String,
    /// Expected `aud` claim.
    pub audience: String,
    pub login_path: String,
    pub refresh_path: String,
    /// Requests whose path contains this (case-insensitively) are never
    /// signed or retried.
    pub auth_path_prefix: String,
    /// Where the navigator is sent on logout or a denied navigation.
    pub login_route: String,
    /// Durable storage key for the refresh token.
    pub refresh_token_key: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: DEFAULT_ISSUER.to_string(),
            audience: DEFAULT_AUDIENCE.to_string(),
            login_path: "/auth/login".to_string(),
            refresh_path: "/auth/refresh".to_string(),
            auth_path_prefix: "/auth/".to_string(),
            login_route: "/login".to_string(),
            refresh_token_key: "refresh_token".to_string(),
        }
    }
}

impl AuthConfig {
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            ..Self::default()
        }
    }
}

/// Where the refresh token is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// OS keychain
    #[default]
    Keyring,
    /// Plain JSON file in the data directory
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub issuer: String,
    pub audience: String,
    pub storage: StorageBackend,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            issuer: DEFAULT_ISSUER.to_string(),
            audience: DEFAULT_AUDIENCE.to_string(),
            storage: StorageBackend::default(),
            last_email: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig::new(self.issuer.as_str(), self.audience.as_str())
    }

    /// Open the configured refresh-token storage.
    pub fn open_storage(&self) -> Result<Arc<dyn KeyValueStore>> {
        Ok(match self.storage {
            StorageBackend::Keyring => Arc::new(KeyringStore::new()),
            StorageBackend::File => Arc::new(FileStore::new(self.data_dir()?.join(CREDENTIALS_FILE))),
        })
    }
}
