//! Configuration file handling.
//!
//! This module provides loading and saving of cvec-db configuration
//! from a TOML file. A loaded [`Config`] is an immutable value: command-line
//! flags produce a new value through the `with_*` builders, and services
//! receive it by reference.
//!
//! # Configuration Location
//!
//! The configuration file is stored at:
//! - Linux: `~/.config/cvec-db/config.toml`
//! - macOS: `~/Library/Application Support/cvec-db/config.toml`
//! - Windows: `%APPDATA%\cvec-db\config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! default_years = 10
//! data_dir = "data"
//! raw_dir = "/home/me/.cache/cvec-db"
//! archive_url = "https://github.com/CVEProject/cvelistV5/archive/refs/heads/main.zip"
//! archive_ttl_hours = 24
//! ```

use anyhow::{Context, Result};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::platform;

/// Archive of the CVE Program's cvelistV5 repository.
pub const DEFAULT_ARCHIVE_URL: &str =
    "https://github.com/CVEProject/cvelistV5/archive/refs/heads/main.zip";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How many calendar years of CVEs to include, counting the current one.
    ///
    /// Default: 10
    pub default_years: u32,

    /// Directory receiving the parquet files and `manifest.json`.
    ///
    /// Default: `data`
    pub data_dir: PathBuf,

    /// Working area for the downloaded archive and unpacked JSON records.
    ///
    /// Default: the platform cache directory
    pub raw_dir: PathBuf,

    /// Location of the cvelistV5 zip archive.
    pub archive_url: String,

    /// Reuse a downloaded archive younger than this many hours.
    ///
    /// Default: 24 hours. Zero always downloads.
    pub archive_ttl_hours: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_years: 10,
            data_dir: PathBuf::from("data"),
            raw_dir: platform::cache_dir(),
            archive_url: DEFAULT_ARCHIVE_URL.to_string(),
            archive_ttl_hours: 24,
        }
    }
}

impl Config {
    /// Loads configuration from the config file.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Loads configuration from an explicit path, falling back to defaults
    /// when the file is absent.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Like [`Config::load`], but a file that cannot be read or parsed is
    /// reported with a warning and the defaults are used instead.
    pub fn load_or_default() -> Self {
        Self::load_or_default_from(&Self::config_path())
    }

    pub fn load_or_default_from(path: &Path) -> Self {
        Self::load_from(path).unwrap_or_else(|e| {
            warn!("Ignoring config file, using defaults: {:#}", e);
            Self::default()
        })
    }

    /// Saves the configuration to the config file.
    ///
    /// Creates the parent directory if it doesn't exist.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Returns the path to the configuration file.
    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }

    /// Generates a string containing the default configuration.
    pub fn generate_default_config() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }

    pub fn with_years(mut self, years: u32) -> Self {
        self.default_years = years;
        self
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn with_raw_dir(mut self, raw_dir: impl Into<PathBuf>) -> Self {
        self.raw_dir = raw_dir.into();
        self
    }

    /// Path of the downloaded archive inside the working area.
    pub fn archive_path(&self) -> PathBuf {
        self.raw_dir.join("cvelistV5.zip")
    }

    /// Root of the unpacked per-record JSON layout (`cves/<year>/...`).
    pub fn records_dir(&self) -> PathBuf {
        self.raw_dir.join("cves")
    }

    /// Calendar years covered by `default_years`, ending with `current_year`.
    ///
    /// A horizon of zero is treated as one year.
    pub fn year_range(&self, current_year: i32) -> RangeInclusive<i32> {
        let span = self.default_years.max(1) as i32;
        (current_year - span + 1)..=current_year
    }

    /// [`year_range`](Self::year_range) anchored at the current UTC year.
    pub fn current_year_range(&self) -> RangeInclusive<i32> {
        self.year_range(chrono::Utc::now().year())
    }
}
