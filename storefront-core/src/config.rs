//! Configuration management
//!
//! Reads `settings.json` from the storefront directory:
//! ```json
//! {
//!   "api": {
//!     "baseUrl": "http://localhost:5000/api",
//!     "requestTimeoutSecs": 10,
//!     "refreshTimeoutSecs": 15,
//!     "refreshPath": "/auth/refreshToken"
//!   }
//! }
//! ```
//! Missing files and fields fall back to defaults; environment variables
//! override whatever the file says.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_REFRESH_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refreshToken";

pub const API_URL_ENV: &str = "STOREFRONT_API_URL";
pub const REQUEST_TIMEOUT_ENV: &str = "STOREFRONT_REQUEST_TIMEOUT_SECS";
pub const REFRESH_TIMEOUT_ENV: &str = "STOREFRONT_REFRESH_TIMEOUT_SECS";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    api: ApiSettings,
    /// Sections this crate does not manage, preserved on save
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Backend connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiSettings {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub refresh_timeout_secs: u64,
    pub refresh_path: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            refresh_timeout_secs: DEFAULT_REFRESH_TIMEOUT_SECS,
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
        }
    }
}

impl ApiSettings {
    /// Check the settings are usable
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid API base URL: {}", self.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("API base URL must use http or https, got {}", url.scheme());
        }
        if self.request_timeout_secs == 0 {
            bail!("Request timeout must be at least one second");
        }
        if self.refresh_timeout_secs == 0 {
            bail!("Refresh timeout must be at least one second");
        }
        if !self.refresh_path.starts_with('/') {
            bail!("Refresh path must start with '/', got {}", self.refresh_path);
        }
        Ok(())
    }
}

/// Storefront configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub api: ApiSettings,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Config {
    pub fn new(api: ApiSettings) -> Self {
        Self {
            api,
            _raw_settings: SettingsFile::default(),
        }
    }

    /// Load config from the storefront directory, applying environment overrides
    pub fn load(storefront_dir: &Path) -> Result<Self> {
        Self::load_with(storefront_dir, |key| std::env::var(key).ok())
    }

    /// Load config using `lookup` to read override variables
    pub fn load_with(storefront_dir: &Path, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let settings_path = storefront_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)
                .with_context(|| format!("Failed to read {}", settings_path.display()))?;
            serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %settings_path.display(), error = %e, "ignoring unreadable settings file");
                SettingsFile::default()
            })
        } else {
            SettingsFile::default()
        };

        let mut api = raw.api.clone();
        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            api.base_url = url.trim().to_string();
        }
        if let Some(secs) = lookup(REQUEST_TIMEOUT_ENV) {
            api.request_timeout_secs = parse_secs(REQUEST_TIMEOUT_ENV, &secs)?;
        }
        if let Some(secs) = lookup(REFRESH_TIMEOUT_ENV) {
            api.refresh_timeout_secs = parse_secs(REFRESH_TIMEOUT_ENV, &secs)?;
        }
        api.validate()?;

        Ok(Self {
            api,
            _raw_settings: raw,
        })
    }

    /// Save config to the storefront directory
    /// Preserves other settings this crate doesn't manage
    pub fn save(&self, storefront_dir: &Path) -> Result<()> {
        self.api.validate()?;
        std::fs::create_dir_all(storefront_dir)
            .with_context(|| format!("Failed to create {}", storefront_dir.display()))?;

        let settings_path = storefront_dir.join("settings.json");
        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_default()
        } else {
            self._raw_settings.clone()
        };
        settings.api = self.api.clone();

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)
            .with_context(|| format!("Failed to write {}", settings_path.display()))?;
        Ok(())
    }
}

fn parse_secs(var: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .with_context(|| format!("{} must be a whole number of seconds, got {:?}", var, value))
}
