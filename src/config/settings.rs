//! Application configuration loading from config.toml
//!
//! The file lists the currencies and categories used to seed a fresh database,
//! plus the backup settings of the maintenance binary. Every section is optional.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable overriding the location of config.toml
pub const CONFIG_PATH_VAR: &str = "MONEYWALLET_CONFIG";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Currency of new wallets when none is given
    #[serde(default = "default_currency")]
    pub default_currency: String,
    /// Currencies to seed
    #[serde(default)]
    pub currencies: Vec<CurrencyConfig>,
    /// Income and expense categories to seed
    #[serde(default)]
    pub categories: Vec<CategoryConfig>,
    /// Backup settings
    #[serde(default)]
    pub backup: BackupConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_currency: default_currency(),
            currencies: Vec::new(),
            categories: Vec::new(),
            backup: BackupConfig::default(),
        }
    }
}

/// Configuration for a single currency
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CurrencyConfig {
    /// ISO 4217 code, e.g. "EUR"
    pub code: String,
    /// Display name
    pub name: String,
    /// Symbol shown next to amounts
    #[serde(default)]
    pub symbol: Option<String>,
    /// Number of minor-unit digits
    #[serde(default = "default_decimals")]
    pub decimals: u32,
}

/// Configuration for a top-level category and its children
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CategoryConfig {
    /// Category name
    pub name: String,
    /// "income" or "expense"
    pub kind: String,
    /// Names of the sub-categories
    #[serde(default)]
    pub children: Vec<String>,
}

/// Backup settings of the maintenance binary
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct BackupConfig {
    /// Directory the local backend writes to
    #[serde(default = "default_backup_directory")]
    pub directory: PathBuf,
    /// Whether a backup is created on every run
    #[serde(default)]
    pub auto_backup: bool,
    /// Number of backups to keep; all of them when absent
    #[serde(default)]
    pub keep_last: Option<usize>,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            directory: default_backup_directory(),
            auto_backup: false,
            keep_last: None,
        }
    }
}

fn default_currency() -> String {
    "EUR".to_string()
}

const fn default_decimals() -> u32 {
    2
}

fn default_backup_directory() -> PathBuf {
    PathBuf::from("data/backups")
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    tracing::debug!("Loading configuration from {}", path.display());
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path.display()),
    })
}

/// Loads configuration from `$MONEYWALLET_CONFIG`, or ./config.toml when unset.
///
/// A missing file is not an error: the defaults are used instead.
pub fn load_default_config() -> Result<AppConfig> {
    let path = std::env::var(CONFIG_PATH_VAR).map_or_else(|_| PathBuf::from("config.toml"), PathBuf::from);
    if !path.exists() {
        tracing::info!("No configuration at {}, using defaults", path.display());
        return Ok(AppConfig::default());
    }
    load_config(path)
}
