//! Dispatcher - drives one request from code to reported output

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::RunnerConfig;
use crate::runner::launcher::{Launcher, ProcessLauncher};
use crate::runner::registry::RunnerRegistry;
use crate::runner::reporter::{self, OutputSink, RunOutcome};
use crate::runner::unit::UnitManager;

/// Composes registry, unit manager, launcher and reporter.
///
/// Runs are independent unless `serialize_runs` is set, in which case a
/// single async lock admits one run at a time.
pub struct Dispatcher {
    registry: RunnerRegistry,
    units: UnitManager,
    launcher: Arc<dyn Launcher>,
    gate: Option<Mutex<()>>,
}

impl Dispatcher {
    pub fn new(registry: RunnerRegistry, units: UnitManager, launcher: Arc<dyn Launcher>) -> Self {
        Dispatcher {
            registry,
            units,
            launcher,
            gate: None,
        }
    }

    /// Dispatcher backed by local toolchains, configured from `config`
    pub fn from_config(config: &RunnerConfig) -> Self {
        let dispatcher = Dispatcher::new(
            RunnerRegistry::builtin(),
            UnitManager::new(config.temp_dir()),
            Arc::new(ProcessLauncher::new()),
        );
        dispatcher.serialized(config.serialize_runs)
    }

    /// Admit only one in-flight run at a time
    pub fn serialized(mut self, enabled: bool) -> Self {
        self.gate = enabled.then(|| Mutex::new(()));
        self
    }

    pub fn registry(&self) -> &RunnerRegistry {
        &self.registry
    }

    /// Execute `code` as `language` and return the terminal outcome.
    ///
    /// Never fails: every error becomes a [`RunOutcome::Failed`].
    pub async fn execute(&self, code: &str, language: &str) -> RunOutcome {
        if code.trim().is_empty() {
            return RunOutcome::NoCode;
        }

        let _guard = match &self.gate {
            Some(gate) => Some(gate.lock().await),
            None => None,
        };

        let strategy = self.registry.resolve(language);
        info!("Running {} code via {}", strategy.language, self.launcher.name());

        let unit = match self.units.materialize(code, strategy).await {
            Ok(unit) => unit,
            Err(e) => {
                warn!("Failed to materialize {} code: {}", strategy.language, e);
                return RunOutcome::Failed {
                    message: e.to_string(),
                };
            }
        };

        match self.launcher.launch(strategy, &unit).await {
            Ok(output) => {
                let result = reporter::on_exit(output, &unit).await;
                debug!("{} run finished with {:?}", strategy.language, result.exit_code);
                RunOutcome::Completed(result)
            }
            Err(e) => {
                warn!("Failed to run {} code: {}", strategy.language, e);
                reporter::cleanup(&unit).await;
                RunOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }

    /// Execute and push the rendered output to `sink` exactly once
    pub async fn run(&self, code: &str, language: &str, sink: &dyn OutputSink) -> String {
        let outcome = self.execute(code, language).await;
        reporter::deliver(&outcome, sink)
    }
}
