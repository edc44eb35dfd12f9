//! Configuration priority: CLI > ENV > TOML > defaults

use serial_test::serial;
use std::io::Write;
use std::path::PathBuf;
use switchcrop_common::config::TomlConfig;
use switchcrop_review::config::{
    ConfigOverrides, ReviewConfig, DEFAULT_BACKEND_URL, ENV_BACKEND_URL, ENV_OUTPUT_DIR,
};
use tempfile::NamedTempFile;

fn clear_env() {
    std::env::remove_var(ENV_BACKEND_URL);
    std::env::remove_var(ENV_OUTPUT_DIR);
}

fn toml_with_backend() -> TomlConfig {
    TomlConfig {
        backend_url: Some("http://toml-host:5000".to_string()),
        output_dir: Some(PathBuf::from("/tmp/from-toml")),
        ..TomlConfig::default()
    }
}

#[test]
#[serial]
fn test_defaults_when_nothing_set() {
    clear_env();
    let config = ReviewConfig::resolve(TomlConfig::default(), ConfigOverrides::default());

    assert_eq!(config.backend_url, DEFAULT_BACKEND_URL);
    assert_eq!(config.output_dir, PathBuf::from("."));
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.request_timeout().as_secs(), 300);
    assert_eq!(config.params().interval.deflection_margin, 0.5);
}

#[test]
#[serial]
fn test_toml_beats_defaults() {
    clear_env();
    let config = ReviewConfig::resolve(toml_with_backend(), ConfigOverrides::default());

    assert_eq!(config.backend_url, "http://toml-host:5000");
    assert_eq!(config.output_dir, PathBuf::from("/tmp/from-toml"));
}

#[test]
#[serial]
fn test_env_beats_toml() {
    clear_env();
    std::env::set_var(ENV_BACKEND_URL, "http://env-host:5000");
    std::env::set_var(ENV_OUTPUT_DIR, "/tmp/from-env");

    let config = ReviewConfig::resolve(toml_with_backend(), ConfigOverrides::default());

    assert_eq!(config.backend_url, "http://env-host:5000");
    assert_eq!(config.output_dir, PathBuf::from("/tmp/from-env"));
    clear_env();
}

#[test]
#[serial]
fn test_cli_beats_env() {
    clear_env();
    std::env::set_var(ENV_BACKEND_URL, "http://env-host:5000");

    let config = ReviewConfig::resolve(
        toml_with_backend(),
        ConfigOverrides {
            backend_url: Some("http://cli-host:5000".to_string()),
            output_dir: None,
            log_level: Some("debug".to_string()),
        },
    );

    assert_eq!(config.backend_url, "http://cli-host:5000");
    assert_eq!(config.output_dir, PathBuf::from("/tmp/from-toml"));
    assert_eq!(config.logging.level, "debug");
    clear_env();
}

#[test]
#[serial]
fn test_blank_env_is_ignored() {
    clear_env();
    std::env::set_var(ENV_BACKEND_URL, "   ");

    let config = ReviewConfig::resolve(toml_with_backend(), ConfigOverrides::default());

    assert_eq!(config.backend_url, "http://toml-host:5000");
    clear_env();
}

#[test]
#[serial]
fn test_load_reads_review_section_from_file() {
    clear_env();
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
backend_url = "http://file-host:5000"

[review]
deflection_margin = 0.25
max_upload_mb = 10
allowed_extensions = ["wav"]
"#
    )
    .unwrap();

    let config = ReviewConfig::load(Some(file.path()), ConfigOverrides::default()).unwrap();
    let params = config.params();

    assert_eq!(config.backend_url, "http://file-host:5000");
    assert_eq!(params.interval.deflection_margin, 0.25);
    assert_eq!(params.staging.max_upload_bytes, 10 * 1024 * 1024);
    assert_eq!(params.staging.allowed_extensions, vec!["wav"]);
    // Unset keys keep their defaults
    assert_eq!(params.max_frequency_hz, 8000.0);
}

#[test]
#[serial]
fn test_load_rejects_invalid_margin() {
    clear_env();
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[review]\ndeflection_margin = -1.0").unwrap();

    assert!(ReviewConfig::load(Some(file.path()), ConfigOverrides::default()).is_err());
}

#[test]
#[serial]
fn test_load_rejects_zero_timeout() {
    clear_env();
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[review]\nrequest_timeout_secs = 0").unwrap();

    assert!(ReviewConfig::load(Some(file.path()), ConfigOverrides::default()).is_err());
}
