//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.project-activity.toml` files.

use crate::activity::LoaderSettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".project-activity.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server connection settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Activity loading settings.
    #[serde(default)]
    pub activity: ActivityConfig,

    /// Preference store settings.
    #[serde(default)]
    pub preferences: PreferencesConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Server connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the server.
    #[serde(default = "default_url")]
    pub url: String,

    /// Authentication token. Prefer the SONAR_TOKEN environment variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            token: None,
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_url() -> String {
    "http://localhost:9000".to_string()
}

fn default_timeout() -> u64 {
    60
}

/// Activity loading settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityConfig {
    /// Page size of the first request.
    #[serde(default = "default_first_batch_size")]
    pub first_batch_size: u32,

    /// Page size of the background backfill.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Maximum number of backfill pages.
    #[serde(default = "default_max_backfill_pages")]
    pub max_backfill_pages: u32,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            first_batch_size: default_first_batch_size(),
            page_size: default_page_size(),
            max_backfill_pages: default_max_backfill_pages(),
        }
    }
}

fn default_first_batch_size() -> u32 {
    100
}

fn default_page_size() -> u32 {
    500
}

fn default_max_backfill_pages() -> u32 {
    1000
}

impl From<&ActivityConfig> for LoaderSettings {
    fn from(config: &ActivityConfig) -> Self {
        Self {
            first_batch_size: config.first_batch_size,
            page_size: config.page_size,
            max_backfill_pages: config.max_backfill_pages,
        }
    }
}

/// Preference store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferencesConfig {
    /// Path of the preferences file. Defaults to the platform config directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Maximum analyses listed in the history section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_analyses: Option<usize>,

    /// Include the measure history table.
    #[serde(default = "default_true")]
    pub include_measures: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            max_analyses: None,
            include_measures: true,
        }
    }
}

fn default_output() -> String {
    "activity_report.md".to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings when given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.url {
            self.server.url = url.clone();
        }
        if let Some(ref token) = args.token {
            self.server.token = Some(token.clone());
        }
        if let Some(timeout) = args.timeout {
            self.server.timeout_seconds = timeout;
        }

        if let Some(page_size) = args.page_size {
            self.activity.page_size = page_size;
        }

        if let Some(ref path) = args.preferences {
            self.preferences.path = Some(path.display().to_string());
        }

        if let Some(ref output) = args.output {
            self.report.output = output.display().to_string();
        }
        if let Some(max) = args.max_analyses {
            self.report.max_analyses = Some(max);
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
