//! Tracing setup
//!
//! Configuration is read before the configured subscriber can exist, so
//! loading runs under a scoped bootstrap subscriber that writes to stderr.
//! Once the config is known, the global subscriber writes to exactly one
//! sink: the `[logging] file` when set, stderr otherwise.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use switchcrop_common::config::LoggingConfig;
use tracing::Subscriber;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

use crate::config::{ConfigOverrides, ReviewConfig};
use crate::error::{ReviewError, ReviewResult};

const BOOTSTRAP_LEVEL: &str = "info";

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "switchcrop={0},switchcrop_review={0},switchcrop_common={0}",
            level
        ))
    })
}

/// Where the configured subscriber writes
#[derive(Debug)]
pub enum LogSink {
    Stderr,
    File(File),
}

impl LogSink {
    /// Open the configured log file (append), or fall back to stderr
    pub fn open(logging: &LoggingConfig) -> ReviewResult<Self> {
        match &logging.file {
            Some(path) => std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map(LogSink::File)
                .map_err(|e| {
                    ReviewError::Common(switchcrop_common::Error::Config(format!(
                        "Failed to open log file {}: {}",
                        path.display(),
                        e
                    )))
                }),
            None => Ok(LogSink::Stderr),
        }
    }
}

/// Subscriber used while the configuration itself is being loaded
///
/// Honours `--log-level` when given, since no file level is known yet.
pub fn bootstrap_subscriber(level: Option<&str>) -> impl Subscriber + Send + Sync + 'static {
    tracing_subscriber::registry()
        .with(env_filter(level.unwrap_or(BOOTSTRAP_LEVEL)))
        .with(fmt::layer().with_writer(std::io::stderr))
}

/// Load configuration with its warnings routed to `subscriber`
pub fn load_config_with<S>(
    subscriber: S,
    config_path: Option<&Path>,
    overrides: ConfigOverrides,
) -> ReviewResult<ReviewConfig>
where
    S: Subscriber + Send + Sync + 'static,
{
    tracing::subscriber::with_default(subscriber, || {
        ReviewConfig::load(config_path, overrides)
    })
}

/// Build the configured subscriber for a single sink
pub fn subscriber(logging: &LoggingConfig, sink: LogSink) -> Box<dyn Subscriber + Send + Sync> {
    let filter = env_filter(&logging.level);
    match sink {
        LogSink::Stderr => Box::new(
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr)),
        ),
        LogSink::File(file) => Box::new(
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file))),
        ),
    }
}

/// Install the configured subscriber globally
pub fn init_tracing(logging: &LoggingConfig) -> ReviewResult<()> {
    let sink = LogSink::open(logging)?;
    tracing::subscriber::set_global_default(subscriber(logging, sink)).map_err(|e| {
        ReviewError::Common(switchcrop_common::Error::Config(format!(
            "Failed to install tracing subscriber: {}",
            e
        )))
    })
}
