//! Tracing subscriber setup

use crate::config::LoggingConfig;
use crate::error::ConfigError;
use crate::{Error, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Level from `-v` flags, falling back to the configured level
pub fn level_for_verbosity(configured: &str, verbose: u8) -> String {
    match verbose {
        0 => configured.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// `RUST_LOG` when set, otherwise `level`
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the global subscriber, writing to `config.file` when set and stderr otherwise
pub fn init_logging(config: &LoggingConfig, verbose: u8) -> Result<()> {
    let filter = build_filter(&level_for_verbosity(&config.level, verbose));

    let result = match &config.file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init(),
    };

    result.map_err(|e| {
        Error::Config(ConfigError::new(format!("Failed to initialise logging: {}", e)).with_key("logging"))
    })
}
