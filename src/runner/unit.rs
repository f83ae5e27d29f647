//! Execution units - transient on-disk artifacts for one run

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::error::Result;
use crate::runner::registry::Strategy;

/// Prefix for run-only source files
pub const FILE_PREFIX: &str = "runcodelocally_";
/// Prefix for compiled-language artifact directories
pub const DIR_PREFIX: &str = "rust_";
/// Source file name inside an artifact directory
pub const DIR_SOURCE_NAME: &str = "main.rs";
/// Compiled binary name inside an artifact directory
pub const OUTPUT_BINARY_NAME: &str = "output";

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Generate a name token that is distinct for every call in this process.
///
/// Milliseconds keep names readable and roughly sortable; the sequence
/// number separates calls landing in the same millisecond.
pub fn unique_token() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{}_{}", millis, seq)
}

/// Artifacts created for a single execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionUnit {
    /// The source file handed to the toolchain
    pub source_file: PathBuf,
    /// Containing directory for compiled languages
    pub artifact_dir: Option<PathBuf>,
    /// Where the compiler writes its binary
    pub output_binary: Option<PathBuf>,
}

/// Writes execution units into a shared temporary area
#[derive(Debug, Clone)]
pub struct UnitManager {
    temp_dir: PathBuf,
}

impl Default for UnitManager {
    fn default() -> Self {
        UnitManager::new(std::env::temp_dir())
    }
}

impl UnitManager {
    pub fn new(temp_dir: impl Into<PathBuf>) -> Self {
        UnitManager {
            temp_dir: temp_dir.into(),
        }
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Write `code` to a fresh unit laid out for `strategy`.
    ///
    /// The caller owns the returned unit and is responsible for cleanup.
    pub async fn materialize(&self, code: &str, strategy: &Strategy) -> Result<ExecutionUnit> {
        let token = unique_token();

        let unit = if strategy.builds_artifact_dir {
            let dir = self.temp_dir.join(format!("{}{}", DIR_PREFIX, token));
            tokio::fs::create_dir(&dir).await?;
            ExecutionUnit {
                source_file: dir.join(DIR_SOURCE_NAME),
                output_binary: Some(dir.join(OUTPUT_BINARY_NAME)),
                artifact_dir: Some(dir),
            }
        } else {
            ExecutionUnit {
                source_file: self
                    .temp_dir
                    .join(format!("{}{}.{}", FILE_PREFIX, token, strategy.extension)),
                artifact_dir: None,
                output_binary: None,
            }
        };

        tokio::fs::write(&unit.source_file, code).await?;
        debug!(
            "Materialized {} unit at {}",
            strategy.language,
            unit.source_file.display()
        );

        Ok(unit)
    }
}
