//! Configuration management for tailfinder.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::details::ProgressSettings;
use crate::error::{Error, Result};
use crate::provider::Provider;
use crate::search::MAX_RECENT_SEARCHES;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "tailfinder";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "preferences.db";

/// Prefix for environment overrides.
const ENV_PREFIX: &str = "TAILFINDER_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. `TAILFINDER_API_URL`, which sets `api.base_url`
/// 2. Environment variables (prefixed with `TAILFINDER_`, sections split on `__`)
/// 3. TOML config file at `~/.config/tailfinder/config.toml`
/// 4. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend configuration.
    pub api: ApiConfig,
    /// Preference storage configuration.
    pub storage: StorageConfig,
    /// Loading indicator configuration.
    pub progress: ProgressConfig,
    /// Search form configuration.
    pub search: SearchConfig,
}

/// Backend configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the lookup backend. May be relative to `origin`.
    pub base_url: String,
    /// Origin that a relative `base_url` is resolved against.
    pub origin: String,
    /// Request timeout in seconds. 0 disables the timeout.
    pub timeout_secs: u64,
}

/// Preference storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/tailfinder/preferences.db`
    pub database_path: Option<PathBuf>,
    /// Number of recent searches to keep, at most 5.
    pub max_recent: usize,
}

/// Loading indicator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Percentage added per tick.
    pub step_percent: u8,
    /// Highest value reached before the response arrives.
    pub ceiling_percent: u8,
    /// Milliseconds between ticks.
    pub tick_ms: u64,
    /// Milliseconds the full bar stays up before the result is shown.
    pub settle_ms: u64,
}

/// Search form configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Provider used when no preference has been stored.
    pub default_provider: Provider,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "/api".to_string(),
            origin: "http://localhost:5000".to_string(),
            timeout_secs: 0,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None, // Will be resolved to default at runtime
            max_recent: MAX_RECENT_SEARCHES,
        }
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        let settings = ProgressSettings::default();
        Self {
            step_percent: settings.step,
            ceiling_percent: settings.ceiling,
            tick_ms: 400,
            settle_ms: 400,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);
        let config: Config = Self::figment(&config_file, ENV_PREFIX).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load only the given file over the defaults, ignoring the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or fails validation.
    pub fn load_file(path: &Path) -> Result<Self> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    fn figment(config_file: &Path, prefix: &str) -> Figment {
        let api_url = format!("{prefix}API_URL");
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(prefix).split("__"))
            .merge(
                Env::raw()
                    .only(&[api_url.as_str()])
                    .map(|_| "api.base_url".into()),
            )
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "api.base_url cannot be empty".to_string(),
            });
        }

        if !is_absolute_url(&self.api.base_url) && !is_absolute_url(&self.api.origin) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "api.origin must be an http(s) URL when api.base_url is relative, got {:?}",
                    self.api.origin
                ),
            });
        }

        if self.progress.step_percent == 0 {
            return Err(Error::ConfigValidation {
                message: "progress.step_percent must be greater than 0".to_string(),
            });
        }

        if self.progress.ceiling_percent == 0 || self.progress.ceiling_percent >= 100 {
            return Err(Error::ConfigValidation {
                message: format!(
                    "progress.ceiling_percent must be between 1 and 99, got {}",
                    self.progress.ceiling_percent
                ),
            });
        }

        if self.progress.tick_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "progress.tick_ms must be greater than 0".to_string(),
            });
        }

        if self.storage.max_recent == 0 || self.storage.max_recent > MAX_RECENT_SEARCHES {
            return Err(Error::ConfigValidation {
                message: format!(
                    "storage.max_recent must be between 1 and {MAX_RECENT_SEARCHES}, got {}",
                    self.storage.max_recent
                ),
            });
        }

        Ok(())
    }

    /// Get the backend base URL, resolving a relative one against the origin.
    #[must_use]
    pub fn api_base_url(&self) -> String {
        let base = self.api.base_url.trim().trim_end_matches('/');
        if is_absolute_url(base) {
            return base.to_string();
        }
        let origin = self.api.origin.trim().trim_end_matches('/');
        let path = base.trim_start_matches('/');
        if path.is_empty() {
            origin.to_string()
        } else {
            format!("{origin}/{path}")
        }
    }

    /// Get the request timeout, if any.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        (self.api.timeout_secs > 0).then(|| Duration::from_secs(self.api.timeout_secs))
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the loading indicator settings.
    #[must_use]
    pub fn progress_settings(&self) -> ProgressSettings {
        ProgressSettings {
            step: self.progress.step_percent,
            ceiling: self.progress.ceiling_percent,
            tick: Duration::from_millis(self.progress.tick_ms),
            settle: Duration::from_millis(self.progress.settle_ms),
        }
    }
}

fn is_absolute_url(value: &str) -> bool {
    let value = value.trim();
    ["http://", "https://"]
        .iter()
        .any(|scheme| value.len() > scheme.len() && value.to_ascii_lowercase().starts_with(scheme))
}
