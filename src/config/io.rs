//! Configuration I/O - Loading and saving configuration
//!
//! Handles reading configuration from files and environment variables.

use std::path::Path;

use super::types::Config;
use crate::error::{Error, Result};

/// Load configuration with layered precedence:
/// 1. Config file (config.json or .toml) if it exists, otherwise defaults
/// 2. Environment variable overrides (includes .env)
pub fn load_config() -> Result<Config> {
    let config_path = super::paths::config_path();

    let mut config = if config_path.exists() {
        load_config_from_path(&config_path)?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config);

    Ok(config)
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    // Detect format by extension
    let config: Config = if path.extension().map_or(false, |ext| ext == "json") {
        json5::from_str(&content).map_err(|e| Error::Config(format!("Invalid JSON config: {}", e)))?
    } else if path.extension().map_or(false, |ext| ext == "toml") {
        toml::from_str(&content).map_err(|e| Error::Config(format!("Invalid TOML config: {}", e)))?
    } else {
        // Try JSON5 first, then TOML
        json5::from_str(&content)
            .or_else(|_| toml::from_str(&content).map_err(|e| Error::Config(e.to_string())))
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?
    };

    Ok(config)
}

/// Apply environment variable overrides to an existing config.
///
/// Loads `.env` first, then overlays any set variables. Env vars have the
/// highest precedence: defaults < file < env.
pub fn apply_env_overrides(config: &mut Config) {
    dotenvy::dotenv().ok();
    apply_overrides(config, |key| std::env::var(key).ok());
}

/// Overlay values from `lookup` onto `config`; unparsable values are ignored
pub fn apply_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(port) = lookup("RUNCODELOCALLY_PORT") {
        if let Ok(port) = port.parse() {
            config.server.port = port;
        }
    }
    if let Some(bind) = lookup("RUNCODELOCALLY_BIND") {
        config.server.bind = bind;
    }
    if let Some(dir) = lookup("RUNCODELOCALLY_TEMP_DIR") {
        config.runner.temp_dir = Some(std::path::PathBuf::from(dir));
    }
    if let Some(language) = lookup("RUNCODELOCALLY_DEFAULT_LANGUAGE") {
        config.runner.default_language = language;
    }
    if let Some(v) = lookup("RUNCODELOCALLY_SERIALIZE_RUNS") {
        config.runner.serialize_runs = v == "true" || v == "1";
    }
}

/// Save configuration to a file
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let content = if path.extension().map_or(false, |ext| ext == "toml") {
        toml::to_string_pretty(config).map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?
    } else {
        serde_json::to_string_pretty(config)?
    };

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, content)?;
    Ok(())
}
