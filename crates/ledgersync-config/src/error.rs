//! Error types for ledgersync-config

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable identifier for each kind of configuration failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfigErrorCode {
    ConfigMissing,
    ConfigUnreadable,
    ConfigMalformed,
    /// A required setting is empty
    SettingMissing,
    /// A setting is present but out of range
    SettingInvalid,
}

impl std::fmt::Display for ConfigErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConfigErrorCode::ConfigMissing => "CONFIG_MISSING",
            ConfigErrorCode::ConfigUnreadable => "CONFIG_UNREADABLE",
            ConfigErrorCode::ConfigMalformed => "CONFIG_MALFORMED",
            ConfigErrorCode::SettingMissing => "SETTING_MISSING",
            ConfigErrorCode::SettingInvalid => "SETTING_INVALID",
        };
        f.write_str(name)
    }
}

/// How a caller should treat a configuration failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigErrorSeverity {
    /// Defaults can stand in
    Warning,
    /// The process cannot continue with this file
    Error,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file {path} does not exist")]
    FileNotFound { path: String },

    #[error("Could not read config file {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Config is not valid YAML: {message}")]
    InvalidYaml { message: String },

    #[error("Setting {field} must not be empty")]
    MissingField { field: String },

    #[error("Setting {field} is invalid: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    pub fn code(&self) -> ConfigErrorCode {
        match self {
            ConfigError::FileNotFound { .. } => ConfigErrorCode::ConfigMissing,
            ConfigError::Unreadable { .. } => ConfigErrorCode::ConfigUnreadable,
            ConfigError::InvalidYaml { .. } => ConfigErrorCode::ConfigMalformed,
            ConfigError::MissingField { .. } => ConfigErrorCode::SettingMissing,
            ConfigError::InvalidValue { .. } => ConfigErrorCode::SettingInvalid,
        }
    }

    /// Only a missing file is recoverable, by falling back to defaults
    pub fn severity(&self) -> ConfigErrorSeverity {
        if matches!(self, ConfigError::FileNotFound { .. }) {
            ConfigErrorSeverity::Warning
        } else {
            ConfigErrorSeverity::Error
        }
    }

    /// What the user can do about it
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            ConfigError::FileNotFound { path } => vec![format!(
                "Run `ledgersync --config {} init-config` to create it.",
                path
            )],
            ConfigError::Unreadable { .. } => {
                vec!["Check the file's permissions.".to_string()]
            }
            ConfigError::InvalidYaml { .. } => vec![
                "Compare the file with the output of `ledgersync init-config`.".to_string(),
            ],
            ConfigError::MissingField { field } => vec![format!("Set {} in the config file.", field)],
            ConfigError::InvalidValue { reason, .. } => vec![reason.clone()],
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
