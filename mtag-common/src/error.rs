//! Common error types for mtag

use std::fmt;
use thiserror::Error;

/// Common result type for mtag operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across mtag crates
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid rule, filter or settings configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML config file could not be parsed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON config or backup file could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML config file could not be parsed
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Error raised while building rules, filters or settings from configuration.
///
/// Carries the offending key and/or value so the user can locate the
/// mistake in their config file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub message: String,
    pub key: Option<String>,
    pub value: Option<String>,
}

impl ConfigError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            key: None,
            value: None,
        }
    }

    /// Attach the config key that caused the error
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Attach the config value that caused the error
    pub fn with_value(mut self, value: impl fmt::Display) -> Self {
        self.value = Some(value.to_string());
        self
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut suffix = Vec::new();
        if let Some(key) = &self.key {
            suffix.push(format!("key='{}'", key));
        }
        if let Some(value) = &self.value {
            suffix.push(format!("value='{}'", value));
        }

        if suffix.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.message, suffix.join(" | "))
        }
    }
}
