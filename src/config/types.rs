//! Configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP ingress configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Code runner configuration
    #[serde(default)]
    pub runner: RunnerConfig,
}

impl Config {
    /// Load configuration from defaults, the config file and environment variables
    pub fn from_env() -> crate::error::Result<Self> {
        crate::config::load_config()
    }
}

/// HTTP ingress configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to bind to
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind address
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: default_port(),
            bind: default_bind(),
        }
    }
}

fn default_port() -> u16 {
    9009
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

/// Code runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Where execution units are written (OS temp dir when unset)
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
    /// Language selected in a freshly shown panel
    #[serde(default = "default_language")]
    pub default_language: String,
    /// Admit only one run at a time
    #[serde(default)]
    pub serialize_runs: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            temp_dir: None,
            default_language: default_language(),
            serialize_runs: false,
        }
    }
}

impl RunnerConfig {
    /// Effective temporary-files area
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

fn default_language() -> String {
    "javascript".to_string()
}
