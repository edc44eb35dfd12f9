//! Runtime configuration for the review client
//!
//! # Configuration Priority
//!
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables (`SWITCHCROP_BACKEND_URL`, `SWITCHCROP_OUTPUT_DIR`)
//! 3. TOML configuration file
//! 4. Built-in defaults (lowest priority)

use crate::error::ReviewResult;
use crate::services::ReviewParams;
use std::path::{Path, PathBuf};
use std::time::Duration;
use switchcrop_common::config::{self as common_config, LoggingConfig, ReviewSection, TomlConfig};
use tracing::info;

pub const ENV_BACKEND_URL: &str = "SWITCHCROP_BACKEND_URL";
pub const ENV_OUTPUT_DIR: &str = "SWITCHCROP_OUTPUT_DIR";

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000";

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub backend_url: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Fully resolved client configuration
#[derive(Debug, Clone)]
pub struct ReviewConfig {
    pub backend_url: String,
    /// Where downloaded archives land
    pub output_dir: PathBuf,
    pub logging: LoggingConfig,
    pub review: ReviewSection,
}

impl ReviewConfig {
    /// Locate and read the TOML file, then layer environment and CLI on top
    ///
    /// A missing file yields defaults; a malformed one is an error.
    pub fn load(config_path: Option<&Path>, overrides: ConfigOverrides) -> ReviewResult<Self> {
        let path = common_config::resolve_config_path(config_path);
        let toml_config = common_config::load_or_default(path.as_deref())?;
        Ok(Self::resolve(toml_config, overrides))
    }

    /// Merge the tiers without touching the filesystem
    pub fn resolve(toml_config: TomlConfig, overrides: ConfigOverrides) -> Self {
        let backend_url = overrides
            .backend_url
            .or_else(|| env_value(ENV_BACKEND_URL))
            .or(toml_config.backend_url)
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

        let output_dir = overrides
            .output_dir
            .or_else(|| env_value(ENV_OUTPUT_DIR).map(PathBuf::from))
            .or(toml_config.output_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut logging = toml_config.logging;
        if let Some(level) = overrides.log_level {
            logging.level = level;
        }

        info!(backend_url = %backend_url, output_dir = %output_dir.display(), "Configuration resolved");

        Self {
            backend_url,
            output_dir,
            logging,
            review: toml_config.review,
        }
    }

    pub fn params(&self) -> ReviewParams {
        ReviewParams::from(&self.review)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.review.request_timeout_secs)
    }
}

/// Non-empty environment variable value
fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
