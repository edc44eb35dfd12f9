//! Bootstrap configuration loading
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)
//!
//! This module owns tiers 3 and 4 plus config-file path resolution. A missing
//! TOML file is never fatal: the caller gets a warning and the defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const ENV_CONFIG_PATH: &str = "SWITCHCROP_CONFIG";

const CONFIG_DIR_NAME: &str = "switchcrop";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Base URL of the analysis backend
    #[serde(default)]
    pub backend_url: Option<String>,

    /// Directory that downloaded archives are written into
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Review tuning parameters (optional)
    #[serde(default)]
    pub review: ReviewSection,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// `[review]` table: named parameters of the interval review workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewSection {
    /// Distance (seconds) the opposite bound is nudged when an edit would
    /// break `start < end`
    pub deflection_margin: f64,

    /// Upper edge of the spectrogram frequency axis (Hz)
    pub max_frequency_hz: f64,

    /// Interval used before any upload and after restart
    pub default_start: f64,
    pub default_end: f64,

    /// Largest batch accepted for upload (MiB)
    pub max_upload_mb: u64,

    /// Per-request timeout for backend calls
    pub request_timeout_secs: u64,

    /// Audio file extensions accepted at staging (case-insensitive)
    pub allowed_extensions: Vec<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Default for ReviewSection {
    fn default() -> Self {
        Self {
            deflection_margin: 0.5,
            max_frequency_hz: 8000.0,
            default_start: 5.5,
            default_end: 6.5,
            max_upload_mb: 500,
            request_timeout_secs: 300,
            allowed_extensions: ["wav", "mp3", "flac", "aac"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            backend_url: None,
            output_dir: None,
            logging: LoggingConfig::default(),
            review: ReviewSection::default(),
        }
    }
}

impl ReviewSection {
    /// Reject parameter combinations the review workflow cannot honour
    pub fn validate(&self) -> Result<()> {
        if !self.deflection_margin.is_finite() || self.deflection_margin <= 0.0 {
            return Err(Error::Config(format!(
                "review.deflection_margin must be a positive number, got {}",
                self.deflection_margin
            )));
        }
        if !self.max_frequency_hz.is_finite() || self.max_frequency_hz <= 0.0 {
            return Err(Error::Config(format!(
                "review.max_frequency_hz must be a positive number, got {}",
                self.max_frequency_hz
            )));
        }
        if !self.default_start.is_finite()
            || !self.default_end.is_finite()
            || self.default_start >= self.default_end
        {
            return Err(Error::Config(format!(
                "review default interval must satisfy start < end, got {}..{}",
                self.default_start, self.default_end
            )));
        }
        if self.max_upload_mb == 0 {
            return Err(Error::Config(
                "review.max_upload_mb must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "review.request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.allowed_extensions.is_empty() {
            return Err(Error::Config(
                "review.allowed_extensions must list at least one extension".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resolve which config file to read
///
/// Priority: explicit path (command line) → `SWITCHCROP_CONFIG` →
/// `<config_dir>/switchcrop/config.toml`.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Some(value) = std::env::var_os(ENV_CONFIG_PATH) {
        if !value.is_empty() {
            let path = PathBuf::from(value);
            if path.is_dir() {
                return Some(path.join(CONFIG_FILE_NAME));
            }
            return Some(path);
        }
    }

    default_config_path()
}

/// Platform config location, e.g. `~/.config/switchcrop/config.toml` on Linux
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    config.review.validate()?;
    Ok(config)
}

/// Load the config file if it exists, otherwise fall back to defaults
///
/// Only a file that exists but cannot be parsed or validated is an error.
pub fn load_or_default(path: Option<&Path>) -> Result<TomlConfig> {
    match path {
        Some(path) if path.exists() => {
            let config = load_toml_config(path)?;
            info!("Loaded configuration from {}", path.display());
            Ok(config)
        }
        Some(path) => {
            warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            );
            Ok(TomlConfig::default())
        }
        None => {
            warn!("Could not determine config directory, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}
