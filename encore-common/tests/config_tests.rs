//! Tests for configuration loading and root folder resolution
//!
//! Covers:
//! - Missing TOML files fall back to compiled defaults
//! - An explicitly named config file must exist
//! - Root folder priority: CLI > ENCORE_ROOT_FOLDER > TOML > OS default
//!
//! Tests that manipulate ENCORE_* variables are marked #[serial] so they do
//! not race each other.

use encore_common::config::{TomlConfig, CONFIG_ENV_VAR, ROOT_FOLDER_ENV_VAR};
use encore_common::Error;
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
#[serial]
fn test_load_explicit_file() {
    env::remove_var(CONFIG_ENV_VAR);
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[search]\nport = 6000\n\n[logging]\nlevel = \"debug\"\n",
    )
    .unwrap();

    let config = TomlConfig::load(Some(&path)).unwrap();

    assert_eq!(config.search.port, 6000);
    assert_eq!(config.logging.level, "debug");
    // Untouched sections keep defaults
    assert_eq!(config.review.port, 5781);
}

#[test]
#[serial]
fn test_load_explicit_missing_file_is_error() {
    env::remove_var(CONFIG_ENV_VAR);
    let result = TomlConfig::load(Some(Path::new("/nonexistent/encore/config.toml")));

    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_load_from_env_var() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("env.toml");
    std::fs::write(&path, "[review]\ndirect_upstream_access = true\n").unwrap();

    env::set_var(CONFIG_ENV_VAR, &path);
    let config = TomlConfig::load(None).unwrap();
    env::remove_var(CONFIG_ENV_VAR);

    assert!(config.review.direct_upstream_access);
}

#[test]
#[serial]
fn test_root_folder_cli_wins() {
    env::set_var(ROOT_FOLDER_ENV_VAR, "/tmp/encore-env-root");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/encore-toml-root")),
        ..Default::default()
    };

    let root = config.resolve_root_folder(Some(Path::new("/tmp/encore-cli-root")));
    env::remove_var(ROOT_FOLDER_ENV_VAR);

    assert_eq!(root, PathBuf::from("/tmp/encore-cli-root"));
}

#[test]
#[serial]
fn test_root_folder_env_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV_VAR, "/tmp/encore-env-root");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/encore-toml-root")),
        ..Default::default()
    };

    let root = config.resolve_root_folder(None);
    env::remove_var(ROOT_FOLDER_ENV_VAR);

    assert_eq!(root, PathBuf::from("/tmp/encore-env-root"));
}

#[test]
#[serial]
fn test_root_folder_toml_then_default() {
    env::remove_var(ROOT_FOLDER_ENV_VAR);

    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/encore-toml-root")),
        ..Default::default()
    };
    assert_eq!(
        config.resolve_root_folder(None),
        PathBuf::from("/tmp/encore-toml-root")
    );

    let defaults = TomlConfig::default().resolve_root_folder(None);
    assert!(!defaults.as_os_str().is_empty());
    assert!(defaults.ends_with("encore") || defaults.ends_with("encore_data"));
}
