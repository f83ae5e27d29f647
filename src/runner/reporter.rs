//! Result reporter - output formatting, cleanup and delivery

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::runner::launcher::ProcessOutput;
use crate::runner::unit::ExecutionUnit;

/// Message reported for blank input
pub const NO_CODE_MESSAGE: &str = "No code to run.";

/// Captured result of one completed execution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
}

impl ExecutionResult {
    /// Text shown to the user: stderr wins over stdout
    pub fn render(&self) -> String {
        if self.stderr.is_empty() {
            return self.stdout.clone();
        }
        let code = match self.exit_code {
            Some(code) => code.to_string(),
            None => "null".to_string(),
        };
        format!("Error ({}):\n{}", code, self.stderr)
    }

    pub fn is_success(&self) -> bool {
        self.stderr.is_empty() && self.exit_code == Some(0)
    }
}

impl From<ProcessOutput> for ExecutionResult {
    fn from(output: ProcessOutput) -> Self {
        ExecutionResult {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.exit_code,
        }
    }
}

/// Terminal state of one dispatched request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Input was blank; nothing was written or spawned
    NoCode,
    /// The toolchain ran to completion (whatever its exit code)
    Completed(ExecutionResult),
    /// Materialization or spawning failed
    Failed { message: String },
}

impl RunOutcome {
    /// Text pushed to the output sink
    pub fn render(&self) -> String {
        match self {
            RunOutcome::NoCode => NO_CODE_MESSAGE.to_string(),
            RunOutcome::Completed(result) => result.render(),
            RunOutcome::Failed { message } => format!("Error running code: {}", message),
        }
    }
}

/// Consumer of rendered execution output
pub trait OutputSink: Send + Sync {
    fn update_output(&self, output: &str);
}

/// Finish an execution: remove the source file and build the result.
pub async fn on_exit(output: ProcessOutput, unit: &ExecutionUnit) -> ExecutionResult {
    cleanup(unit).await;
    output.into()
}

/// Delete the unit's source file.
///
/// Compiled-language directories and binaries are left in place. Failures
/// are logged and swallowed.
pub async fn cleanup(unit: &ExecutionUnit) {
    match tokio::fs::remove_file(&unit.source_file).await {
        Ok(()) => debug!("Removed {}", unit.source_file.display()),
        Err(e) => warn!(
            "Failed to delete temp file {}: {}",
            unit.source_file.display(),
            e
        ),
    }
}

/// Push the rendered outcome to the sink and return the text
pub fn deliver(outcome: &RunOutcome, sink: &dyn OutputSink) -> String {
    let output = outcome.render();
    sink.update_output(&output);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<String>>);

    impl OutputSink for RecordingSink {
        fn update_output(&self, output: &str) {
            self.0.lock().unwrap().push(output.to_string());
        }
    }

    #[test]
    fn test_render_prefers_stderr() {
        let ok = ExecutionResult {
            stdout: "x\n".to_string(),
            stderr: String::new(),
            exit_code: Some(0),
        };
        assert_eq!(ok.render(), "x\n");
        assert!(ok.is_success());

        let failed = ExecutionResult {
            stdout: "partial".to_string(),
            stderr: "boom".to_string(),
            exit_code: Some(1),
        };
        assert_eq!(failed.render(), "Error (1):\nboom");

        // Warnings on stderr are reported as errors even on exit 0
        let warned = ExecutionResult {
            stderr: "deprecated".to_string(),
            exit_code: Some(0),
            ..Default::default()
        };
        assert_eq!(warned.render(), "Error (0):\ndeprecated");

        let killed = ExecutionResult {
            stderr: "killed".to_string(),
            exit_code: None,
            ..Default::default()
        };
        assert_eq!(killed.render(), "Error (null):\nkilled");
    }

    #[test]
    fn test_outcome_render() {
        assert_eq!(RunOutcome::NoCode.render(), "No code to run.");
        let failed = RunOutcome::Failed {
            message: "nope".to_string(),
        };
        assert_eq!(failed.render(), "Error running code: nope");
    }

    #[test]
    fn test_deliver_pushes_once() {
        let sink = RecordingSink::default();
        let text = deliver(&RunOutcome::NoCode, &sink);
        assert_eq!(text, "No code to run.");
        assert_eq!(*sink.0.lock().unwrap(), vec!["No code to run.".to_string()]);
    }

    #[tokio::test]
    async fn test_on_exit_removes_source_only() {
        let dir = tempdir().unwrap();
        let artifact_dir = dir.path().join("rust_1");
        std::fs::create_dir(&artifact_dir).unwrap();
        let unit = ExecutionUnit {
            source_file: artifact_dir.join("main.rs"),
            output_binary: Some(artifact_dir.join("output")),
            artifact_dir: Some(artifact_dir.clone()),
        };
        std::fs::write(&unit.source_file, "fn main() {}").unwrap();
        std::fs::write(unit.output_binary.as_ref().unwrap(), "bin").unwrap();

        let result = on_exit(
            ProcessOutput {
                stdout: "hi".to_string(),
                stderr: String::new(),
                exit_code: Some(0),
            },
            &unit,
        )
        .await;

        assert_eq!(result.render(), "hi");
        assert!(!unit.source_file.exists());
        assert!(artifact_dir.is_dir());
        assert!(unit.output_binary.as_ref().unwrap().exists());
    }

    #[tokio::test]
    async fn test_cleanup_failure_is_swallowed() {
        let dir = tempdir().unwrap();
        let unit = ExecutionUnit {
            source_file: dir.path().join("already-gone.js"),
            artifact_dir: None,
            output_binary: None,
        };
        let result = on_exit(ProcessOutput::default(), &unit).await;
        assert_eq!(result, ExecutionResult::default());
    }
}
