//! Configuration management for ledgersync
//!
//! This module handles loading, validation, and management of
//! ledgersync configuration from YAML files.

pub mod error;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use error::{ConfigError, ConfigResult};

/// Largest page size the store is asked for
pub const MAX_PAGE_SIZE: u32 = 1000;

// ==================== Configuration Types ====================

/// Remote transaction store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the REST API (e.g. "http://localhost:8080/api")
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

/// Pagination settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Transactions per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// How to read the store's count endpoint
    #[serde(default)]
    pub count_semantics: CountSemantics,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            count_semantics: CountSemantics::default(),
        }
    }
}

fn default_page_size() -> u32 {
    10
}

/// What the number returned by `GET /transactions/count` means
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountSemantics {
    /// Total number of transactions; pages are derived from the page size
    Items,
    /// Total number of pages for the requested page size
    Pages,
}

impl Default for CountSemantics {
    fn default() -> Self {
        CountSemantics::Items
    }
}

impl CountSemantics {
    /// Turn a store-reported count into a page count for `page_size`
    pub fn page_count(&self, reported: u64, page_size: u32) -> u64 {
        match self {
            CountSemantics::Pages => reported,
            CountSemantics::Items => {
                let size = u64::from(page_size.max(1));
                reported.div_ceil(size)
            }
        }
    }
}

impl std::str::FromStr for CountSemantics {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "items" => Ok(CountSemantics::Items),
            "pages" => Ok(CountSemantics::Pages),
            _ => Err(format!("Invalid count semantics: {}", s)),
        }
    }
}

impl std::fmt::Display for CountSemantics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CountSemantics::Items => write!(f, "items"),
            CountSemantics::Pages => write!(f, "pages"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: debug, info, warn, error
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

fn default_log_level() -> String {
    "info".to_string()
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Remote store settings
    #[serde(default)]
    pub store: StoreConfig,
    /// Pagination settings
    #[serde(default)]
    pub pagination: PaginationConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => ConfigError::Unreadable {
                path: path.display().to_string(),
                source: e,
            },
        })?;

        Self::from_yaml(&content)
    }

    /// Load configuration, falling back to defaults when the file is absent
    pub fn load_or_default(path: impl AsRef<Path>) -> ConfigResult<Self> {
        match Self::load(path) {
            Err(ConfigError::FileNotFound { .. }) => Ok(Self::default()),
            other => other,
        }
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(content: &str) -> ConfigResult<Self> {
        let config: Config = serde_yaml::from_str(content).map_err(|e| ConfigError::InvalidYaml {
            message: e.to_string(),
        })?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> ConfigResult<()> {
        let base_url = self.store.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::MissingField {
                field: "store.base_url".to_string(),
            });
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "store.base_url".to_string(),
                reason: "Base URL must start with http:// or https://".to_string(),
            });
        }

        if self.store.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "store.timeout_ms".to_string(),
                reason: "Timeout must be greater than 0".to_string(),
            });
        }

        if self.pagination.page_size == 0 || self.pagination.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidValue {
                field: "pagination.page_size".to_string(),
                reason: format!("Page size must be between 1 and {}", MAX_PAGE_SIZE),
            });
        }

        Ok(())
    }

    /// Generate a default configuration file
    pub fn generate_default() -> &'static str {
        include_str!("../templates/default_config.yaml")
    }

    /// Default location of the configuration file
    pub fn default_path() -> PathBuf {
        PathBuf::from("ledgersync.yaml")
    }

    /// Store base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.store.base_url.trim().trim_end_matches('/')
    }
}

// ==================== Tests ====================
