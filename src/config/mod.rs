//! Configuration module
//!
//! - types.rs: configuration types (Config, ServerConfig, RunnerConfig)
//! - io.rs: loading and saving, env overrides
//! - validation.rs: configuration validation
//! - paths.rs: configuration file paths

mod io;
mod paths;
mod types;
mod validation;

pub use types::{Config, RunnerConfig, ServerConfig};

pub use io::{apply_env_overrides, apply_overrides, load_config, load_config_from_path, save_config};
pub use paths::{config_dir, config_path};
pub use validation::{validate_config, ConfigValidationResult, ValidationIssue};
