//! Configuration validation
//!
//! Validates configuration and reports issues.

use super::types::Config;
use crate::runner::Language;

/// Result of configuration validation
#[derive(Debug, Clone)]
pub struct ConfigValidationResult {
    /// Whether the config is valid
    pub valid: bool,
    /// Validation errors (critical)
    pub errors: Vec<ValidationIssue>,
    /// Validation warnings (non-critical)
    pub warnings: Vec<ValidationIssue>,
}

impl ConfigValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        ConfigValidationResult {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error
    pub fn with_error(mut self, issue: ValidationIssue) -> Self {
        self.valid = false;
        self.errors.push(issue);
        self
    }

    /// Add a warning
    pub fn with_warning(mut self, issue: ValidationIssue) -> Self {
        self.warnings.push(issue);
        self
    }
}

/// A validation issue
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the config field
    pub path: String,
    /// Issue message
    pub message: String,
    /// Suggested fix
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    /// Create a new issue
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " ({})", suggestion)?;
        }
        Ok(())
    }
}

/// Validate the configuration
pub fn validate_config(config: &Config) -> ConfigValidationResult {
    let mut result = ConfigValidationResult::valid();

    result = validate_server_config(config, result);
    result = validate_runner_config(config, result);

    result
}

fn validate_server_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    if config.server.port == 0 {
        result = result.with_error(
            ValidationIssue::new("server.port", "Port must be non-zero")
                .with_suggestion("Set RUNCODELOCALLY_PORT or server.port (default 9009)"),
        );
    }

    if config.server.bind.trim().is_empty() {
        result = result.with_error(
            ValidationIssue::new("server.bind", "Bind address is empty")
                .with_suggestion("Use 127.0.0.1 to accept local connections only"),
        );
    }

    result
}

fn validate_runner_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    if config.runner.default_language.parse::<Language>().is_err() {
        result = result.with_warning(ValidationIssue::new(
            "runner.default_language",
            format!(
                "Unknown language '{}'; code will run as javascript",
                config.runner.default_language
            ),
        ));
    }

    if let Some(dir) = &config.runner.temp_dir {
        if !dir.is_dir() {
            result = result.with_warning(
                ValidationIssue::new(
                    "runner.temp_dir",
                    format!("{} does not exist; every run will fail", dir.display()),
                )
                .with_suggestion("Create the directory or unset runner.temp_dir"),
            );
        }
    }

    result
}
