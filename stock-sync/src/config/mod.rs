//! Configuration loading
//!
//! A TOML file with a `[drive]` table describing the remote sheet, a `[stock]`
//! table describing the export file, and an optional `[transport]` table.
//! Column-title keys keep the names used by existing config files
//! (`ID_title`, `TVA_title`, ...).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::sheets::{RetryConfig, SHEETS_API_BASE};

pub const CONFIG_ENV: &str = "STOCK_SYNC_CONFIG";
pub const TOKEN_ENV: &str = "STOCK_SYNC_TOKEN";
const CONFIG_FILE: &str = "config.toml";
const TOKEN_FILE: &str = "token.json";
const APP_DIR: &str = "stock-sync";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub drive: DriveConfig,
    #[serde(default)]
    pub stock: ExportConfig,
    #[serde(default)]
    pub transport: TransportConfig,
}

/// Remote sheet coordinates and column titles
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriveConfig {
    /// Spreadsheet id
    pub spreadsheet: String,
    /// Tab name used as range prefix
    pub sheet_label: String,
    #[serde(rename = "ID_title")]
    pub id_title: String,
    #[serde(default)]
    pub name_title: Option<String>,
    #[serde(default)]
    pub stock_title: Option<String>,
    #[serde(default)]
    pub price_title: Option<String>,
    #[serde(default)]
    pub quantity_price_title: Option<String>,
    #[serde(default)]
    pub cond_title: Option<String>,
    #[serde(default, rename = "TVA_title")]
    pub tax_title: Option<String>,
    #[serde(default)]
    pub images_title: Option<String>,
}

/// Column names of the uploaded export
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportConfig {
    #[serde(default, rename = "ID_title")]
    pub id_title: Option<String>,
    #[serde(default)]
    pub name_title: Option<String>,
    #[serde(default)]
    pub stock_title: Option<String>,
    #[serde(default)]
    pub price_title: Option<String>,
    #[serde(default)]
    pub by_unit_title: Option<String>,
    #[serde(default, rename = "TVA_title")]
    pub tax_title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Values API root, overridable for proxies
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_api_base() -> String {
    SHEETS_API_BASE.to_string()
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            api_base: default_api_base(),
        }
    }
}

impl TransportConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts.max(1),
            ..RetryConfig::default()
        }
    }
}

/// Value of a key a command cannot run without
pub fn require<'a>(value: &'a Option<String>, section: &str, key: &str) -> Result<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("Missing required config key [{}] {}", section, key))
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Invalid configuration")?;
        anyhow::ensure!(
            !config.drive.spreadsheet.trim().is_empty(),
            "Missing required config key [drive] spreadsheet"
        );
        anyhow::ensure!(
            !config.drive.sheet_label.trim().is_empty(),
            "Missing required config key [drive] sheet_label"
        );
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("In config file: {}", path.display()))
    }
}

/// Config path: explicit flag, then `STOCK_SYNC_CONFIG`, then `./config.toml`,
/// then `<config dir>/stock-sync/config.toml`
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return PathBuf::from(path);
    }

    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return local;
    }

    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
        .filter(|path| path.exists())
        .unwrap_or(local)
}

/// Token path: explicit flag, then `STOCK_SYNC_TOKEN`, then `./token.json`
pub fn resolve_token_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var(TOKEN_ENV).ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(TOKEN_FILE))
}
