//! Configuration loading and config file resolution
//!
//! A config file holds the library locations, which tags may be written
//! back to files, the tagging rules and logging settings:
//!
//! ```yaml
//! library:
//!   paths: [/music]
//! updater:
//!   tags: [title, artist, album, track_number]
//!   replace: false
//! tags:
//!   rules:
//!     - filter: {field: album, is: "X"}
//!       title: "T"
//! logging:
//!   level: debug
//! dry_run: false
//! ```
//!
//! Tagging rules are built while the file is deserialised so an invalid
//! rule fails the load.

use crate::error::ConfigError;
use crate::field::Field;
use crate::tagger::Tagger;
use crate::{Error, Result};
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "MTAG_CONFIG";

/// Folder and file name looked up in the platform config directory
pub const APP_DIR: &str = "mtag";
pub const DEFAULT_CONFIG_FILE: &str = "config.yml";

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub library: LibraryConfig,

    #[serde(default)]
    pub updater: UpdaterConfig,

    #[serde(default)]
    pub tags: TagsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Report changes without writing files (default: true)
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            library: LibraryConfig::default(),
            updater: UpdaterConfig::default(),
            tags: TagsConfig::default(),
            logging: LoggingConfig::default(),
            dry_run: default_dry_run(),
        }
    }
}

/// Local library locations
#[derive(Debug, Clone, Deserialize)]
pub struct LibraryConfig {
    /// Folders scanned for audio files
    #[serde(default)]
    pub paths: Vec<PathBuf>,

    /// Accepted file extensions, without the dot (default: common audio formats)
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            extensions: default_extensions(),
        }
    }
}

/// Controls how changed tags are written back to files
#[derive(Debug, Clone, Deserialize)]
pub struct UpdaterConfig {
    /// Tag fields which may be written (default: every tag field)
    #[serde(default = "Field::tags", deserialize_with = "deserialize_tag_fields")]
    pub tags: Vec<Field>,

    /// When true a cleared value removes the tag from the file
    #[serde(default)]
    pub replace: bool,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            tags: Field::tags(),
            replace: false,
        }
    }
}

/// Auto-tagging settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagsConfig {
    #[serde(default)]
    pub rules: Tagger,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_dry_run() -> bool {
    true
}

fn default_extensions() -> Vec<String> {
    ["flac", "mp3", "m4a", "ogg", "opus", "wav", "wma", "aiff", "ape", "wv"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Accepts field names or aliases; file properties are rejected as they are not written to tags
fn deserialize_tag_fields<'de, D>(deserializer: D) -> std::result::Result<Vec<Field>, D::Error>
where
    D: Deserializer<'de>,
{
    let names = Vec::<String>::deserialize(deserializer)?;
    let fields = Field::from_names(&names).map_err(serde::de::Error::custom)?;
    if let Some(field) = fields.iter().find(|field| !field.is_tag()) {
        let err = ConfigError::new("Only tag fields can be written to files")
            .with_key("updater.tags")
            .with_value(field);
        return Err(serde::de::Error::custom(err));
    }
    Ok(fields)
}

/// Supported config file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

impl ConfigFormat {
    /// Pick the format from a file extension, defaulting to YAML
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "json" => ConfigFormat::Json,
            "toml" => ConfigFormat::Toml,
            _ => ConfigFormat::Yaml,
        }
    }
}

impl AppConfig {
    /// Parse config text in the given format
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        let config = match format {
            ConfigFormat::Yaml => serde_yaml::from_str(content)?,
            ConfigFormat::Json => serde_json::from_str(content)?,
            ConfigFormat::Toml => toml::from_str(content)?,
        };
        Ok(config)
    }

    /// Load a config file, choosing the parser by extension
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::NotFound(format!("Config file not found: {}", path.display())));
        }

        let content = std::fs::read_to_string(path)?;
        let format = ConfigFormat::from_path(path);
        debug!(path = %path.display(), ?format, "Loading config file");
        Self::parse(&content, format)
    }
}

/// Platform default config file location, e.g. `~/.config/mtag/config.yml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(DEFAULT_CONFIG_FILE))
}

/// Config file resolution following priority order:
/// 1. Command-line argument (highest priority)
/// 2. `MTAG_CONFIG` environment variable
/// 3. Platform config directory (fallback, must exist)
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    match default_config_path() {
        Some(path) if path.is_file() => Ok(path),
        Some(path) => Err(Error::NotFound(format!(
            "No config file given and none found at {}",
            path.display()
        ))),
        None => Err(Error::NotFound(
            "No config file given and could not determine config directory".to_string(),
        )),
    }
}
