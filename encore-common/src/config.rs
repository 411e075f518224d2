//! Configuration loading and root folder resolution
//!
//! Bootstrap settings come from a TOML file. Resolution priority for every
//! value is:
//! 1. Command-line argument (handled by each binary via clap, with `env` fallbacks)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "ENCORE_CONFIG";

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV_VAR: &str = "ENCORE_ROOT_FOLDER";

/// Default iTunes Search API base URL
pub const DEFAULT_CATALOG_BASE_URL: &str = "https://itunes.apple.com";

/// Default SoundCloud base URL (oEmbed lives at `/oembed`)
pub const DEFAULT_EMBED_BASE_URL: &str = "https://soundcloud.com";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// Folder holding the database and stored objects
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub review: ReviewConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Search proxy (encore-sp) settings
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_port")]
    pub port: u16,

    #[serde(default = "default_catalog_base_url")]
    pub catalog_base_url: String,

    #[serde(default = "default_embed_base_url")]
    pub embed_base_url: String,

    /// Timeout applied to each outbound call
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            port: default_search_port(),
            catalog_base_url: default_catalog_base_url(),
            embed_base_url: default_embed_base_url(),
            upstream_timeout_secs: default_upstream_timeout_secs(),
        }
    }
}

/// Review service (encore-rv) settings
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewConfig {
    #[serde(default = "default_review_port")]
    pub port: u16,

    /// SQLite database file; defaults to `<root_folder>/encore.db`
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Base URL of the search proxy
    #[serde(default = "default_proxy_base_url")]
    pub proxy_base_url: String,

    /// Call the catalog directly instead of going through the search proxy
    #[serde(default)]
    pub direct_upstream_access: bool,

    /// Base URL under which stored objects are publicly reachable
    #[serde(default = "default_public_storage_url")]
    pub public_storage_url: String,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            port: default_review_port(),
            database_path: None,
            proxy_base_url: default_proxy_base_url(),
            direct_upstream_access: false,
            public_storage_url: default_public_storage_url(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_search_port() -> u16 {
    5780
}

fn default_review_port() -> u16 {
    5781
}

fn default_catalog_base_url() -> String {
    DEFAULT_CATALOG_BASE_URL.to_string()
}

fn default_embed_base_url() -> String {
    DEFAULT_EMBED_BASE_URL.to_string()
}

fn default_upstream_timeout_secs() -> u64 {
    10
}

fn default_proxy_base_url() -> String {
    "http://127.0.0.1:5780".to_string()
}

fn default_public_storage_url() -> String {
    "http://127.0.0.1:5781/storage".to_string()
}

impl TomlConfig {
    /// Load configuration, falling back to defaults when no file exists
    ///
    /// An explicitly requested file (argument or `ENCORE_CONFIG`) must exist;
    /// the platform locations are optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let explicit = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from));

        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                path
            }
            None => match default_config_file() {
                Some(path) => path,
                None => {
                    warn!("No config file found, using compiled defaults");
                    return Ok(Self::default());
                }
            },
        };

        let content = std::fs::read_to_string(&path)?;
        let config = Self::parse(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse TOML content
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Resolve the root folder: CLI > environment > TOML > OS default
    pub fn resolve_root_folder(&self, cli_arg: Option<&Path>) -> PathBuf {
        if let Some(path) = cli_arg {
            return path.to_path_buf();
        }
        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV_VAR) {
            return PathBuf::from(path);
        }
        if let Some(path) = &self.root_folder {
            return path.clone();
        }
        default_root_folder()
    }
}

impl ReviewConfig {
    /// Database file for the review service
    pub fn database_file(&self, root_folder: &Path) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| root_folder.join("encore.db"))
    }
}

/// First existing platform config file, if any
fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("encore").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(unix) {
        let system_config = PathBuf::from("/etc/encore/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default root folder
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("encore"))
        .unwrap_or_else(|| PathBuf::from("./encore_data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = TomlConfig::parse("").unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.search.port, 5780);
        assert_eq!(config.search.catalog_base_url, DEFAULT_CATALOG_BASE_URL);
        assert_eq!(config.review.port, 5781);
        assert!(!config.review.direct_upstream_access);
    }

    #[test]
    fn test_partial_sections() {
        let config = TomlConfig::parse(
            r#"
            root_folder = "/srv/encore"

            [review]
            direct_upstream_access = true
            proxy_base_url = "https://encore.example/proxy"
            "#,
        )
        .unwrap();

        assert_eq!(config.root_folder, Some(PathBuf::from("/srv/encore")));
        assert!(config.review.direct_upstream_access);
        assert_eq!(config.review.proxy_base_url, "https://encore.example/proxy");
        assert_eq!(config.review.port, 5781);
        assert_eq!(config.search.upstream_timeout_secs, 10);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = TomlConfig::parse("[search\nport = ").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_database_file_defaults_into_root() {
        let review = ReviewConfig::default();
        assert_eq!(
            review.database_file(Path::new("/data")),
            PathBuf::from("/data/encore.db")
        );
    }
}
