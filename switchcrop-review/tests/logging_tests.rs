//! Log routing while the configuration is loaded

mod helpers;

use helpers::log_capture::LogCapture;
use serial_test::serial;
use std::io::Write;
use switchcrop_common::config::ENV_CONFIG_PATH;
use switchcrop_review::config::{ConfigOverrides, ENV_BACKEND_URL};
use switchcrop_review::logging::load_config_with;
use tempfile::{NamedTempFile, TempDir};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;

fn capturing() -> (LogCapture, impl tracing::Subscriber + Send + Sync + 'static) {
    let capture = LogCapture::new();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    (capture, subscriber)
}

#[test]
#[serial]
fn test_missing_config_file_warning_is_logged() {
    std::env::remove_var(ENV_CONFIG_PATH);
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.toml");
    let (capture, subscriber) = capturing();

    let config = load_config_with(subscriber, Some(&missing), ConfigOverrides::default()).unwrap();

    assert_eq!(config.review.deflection_margin, 0.5);
    capture.assert_contains(Level::WARN, "not found, using built-in defaults");
    capture.assert_contains(Level::WARN, "absent.toml");
}

#[test]
#[serial]
fn test_loaded_config_file_is_reported() {
    std::env::remove_var(ENV_CONFIG_PATH);
    std::env::remove_var(ENV_BACKEND_URL);
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "backend_url = \"http://file-host:5000\"").unwrap();
    let (capture, subscriber) = capturing();

    let config = load_config_with(subscriber, Some(file.path()), ConfigOverrides::default()).unwrap();

    assert_eq!(config.backend_url, "http://file-host:5000");
    capture.assert_contains(Level::INFO, "Loaded configuration from");
    capture.assert_contains(Level::INFO, "Configuration resolved");
    assert!(!capture.contains(Level::WARN, "not found"));
}
