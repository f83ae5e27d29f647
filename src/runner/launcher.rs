//! Process launcher - spawns toolchains and captures their output

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::runner::registry::{Arg, LaunchPlan, Strategy};
use crate::runner::unit::ExecutionUnit;

/// Everything a finished process reported
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
}

/// Trait for launch backends
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Get the launcher name
    fn name(&self) -> &str;

    /// Run the unit according to the strategy's launch plan and wait for it to exit
    async fn launch(&self, strategy: &Strategy, unit: &ExecutionUnit) -> Result<ProcessOutput>;
}

/// Launches local toolchains with `tokio::process`
#[derive(Debug, Clone, Default)]
pub struct ProcessLauncher;

impl ProcessLauncher {
    pub fn new() -> Self {
        ProcessLauncher
    }
}

#[async_trait]
impl Launcher for ProcessLauncher {
    fn name(&self) -> &str {
        "process"
    }

    async fn launch(&self, strategy: &Strategy, unit: &ExecutionUnit) -> Result<ProcessOutput> {
        match strategy.launch_plan {
            LaunchPlan::RunOnly { program, args } => {
                let mut command = Command::new(program);
                command.args(render_args(args, unit)?);
                run_captured(program, &mut command).await
            }
            LaunchPlan::CompileThenRun {
                compiler,
                compile_args,
            } => {
                let binary = unit.output_binary.as_ref().ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "{} unit has no output binary path",
                        strategy.language
                    ))
                })?;

                // Compiler output is not surfaced; only the run phase is captured.
                let status = Command::new(compiler)
                    .args(render_args(compile_args, unit)?)
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status()
                    .await
                    .map_err(|source| Error::Spawn {
                        program: compiler.to_string(),
                        source,
                    })?;

                if !status.success() {
                    info!("{} exited with {} for {}", compiler, status, unit.source_file.display());
                }

                let program = binary.display().to_string();
                let mut command = Command::new(binary);
                run_captured(&program, &mut command).await
            }
        }
    }
}

/// Expand an argument template against a unit's paths
pub fn render_args(template: &[Arg], unit: &ExecutionUnit) -> Result<Vec<OsString>> {
    template
        .iter()
        .map(|arg| match arg {
            Arg::Literal(s) => Ok(OsString::from(*s)),
            Arg::SourceFile => Ok(unit.source_file.clone().into_os_string()),
            Arg::OutputBinary => unit
                .output_binary
                .clone()
                .map(|p| p.into_os_string())
                .ok_or_else(|| {
                    Error::InvalidInput("argument template needs an output binary".to_string())
                }),
        })
        .collect()
}

/// Spawn `command`, drain both pipes concurrently and wait for exit
async fn run_captured(program: &str, command: &mut Command) -> Result<ProcessOutput> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("Spawning {:?}", command.as_std());
    let start = Instant::now();

    let mut child = command.spawn().map_err(|source| Error::Spawn {
        program: program.to_string(),
        source,
    })?;

    let stdout_task = tokio::spawn(read_stream(child.stdout.take()));
    let stderr_task = tokio::spawn(read_stream(child.stderr.take()));

    let status = child.wait().await?;

    let stdout = stdout_task.await.unwrap_or_default();
    let stderr = stderr_task.await.unwrap_or_default();

    debug!("{} finished with {} in {:?}", program, status, start.elapsed());

    Ok(ProcessOutput {
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        exit_code: status.code(),
    })
}

/// Append every chunk of a stream, in arrival order, until EOF
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    let Some(mut reader) = handle else {
        return buf;
    };
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(e) => {
                warn!("Output stream closed early after {} bytes: {}", buf.len(), e);
                break;
            }
        }
    }
    buf
}
