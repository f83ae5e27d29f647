//! Error types for RunCodeLocally

use thiserror::Error;

/// Result type alias using RunCodeLocally's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for RunCodeLocally
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A toolchain process could not be started
    #[error("Failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// HTTP server error
    #[error("Server error: {0}")]
    Server(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Check if the error came from a missing or unstartable toolchain
    pub fn is_spawn_failure(&self) -> bool {
        matches!(self, Error::Spawn { .. })
    }
}
