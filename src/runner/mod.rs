//! Runner module - turns `(code, language)` into reported output
//!
//! Pipeline, leaves first:
//! - registry: language key to immutable [`Strategy`]
//! - unit: writes the code into a transient [`ExecutionUnit`]
//! - launcher: spawns the toolchain and captures stdout/stderr
//! - reporter: formats the result, removes the source file, feeds the sink
//! - dispatcher: composes the above for one request

mod dispatcher;
mod launcher;
mod registry;
mod reporter;
mod unit;

pub use dispatcher::Dispatcher;
pub use launcher::{render_args, Launcher, ProcessLauncher, ProcessOutput};
pub use registry::{Arg, Language, LaunchPlan, RunnerRegistry, Strategy, ToolchainStatus};
pub use reporter::{cleanup, deliver, on_exit, ExecutionResult, OutputSink, RunOutcome, NO_CODE_MESSAGE};
pub use unit::{unique_token, ExecutionUnit, UnitManager};
