//! Code runner panel - the UI-side state holder
//!
//! The panel shows the last received code and the last output. UIs talk to
//! it with [`PanelMessage`]s and observe it through a `watch` channel of
//! [`PanelSnapshot`]s; every change carries the [`PanelEvent`] that caused it.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::runner::{Dispatcher, OutputSink};
use crate::server::CodeReceiver;

/// Messages a UI sends to the panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum PanelMessage {
    RunCode {
        code: String,
        #[serde(default)]
        language: Option<String>,
    },
    ClearCode,
    ChangeLanguage { language: String },
}

/// Changes the panel publishes to UIs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum PanelEvent {
    UpdateCode { code: String, language: String },
    UpdateOutput { output: String },
    ClearOutput,
}

/// Everything a UI needs to render the panel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PanelSnapshot {
    pub code: String,
    pub language: String,
    pub output: String,
    pub server_port: u16,
    /// Bumped on every published event
    pub revision: u64,
    pub last_event: Option<PanelEvent>,
}

pub struct Panel {
    dispatcher: Arc<Dispatcher>,
    current_language: Mutex<String>,
    state: watch::Sender<PanelSnapshot>,
}

impl Panel {
    pub fn new(dispatcher: Arc<Dispatcher>, default_language: &str, server_port: u16) -> Self {
        let (state, _) = watch::channel(PanelSnapshot {
            language: default_language.to_string(),
            server_port,
            ..Default::default()
        });
        Panel {
            dispatcher,
            current_language: Mutex::new(default_language.to_string()),
            state,
        }
    }

    /// Observe panel changes
    pub fn subscribe(&self) -> watch::Receiver<PanelSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> PanelSnapshot {
        self.state.borrow().clone()
    }

    pub fn current_language(&self) -> String {
        lock(&self.current_language).clone()
    }

    /// Re-show an existing panel: new port, language reset to `default_language`
    pub fn reveal(&self, server_port: u16, default_language: &str) {
        self.set_language(default_language);
        self.state.send_modify(|s| {
            s.server_port = server_port;
            s.language = default_language.to_string();
        });
    }

    pub fn set_server_port(&self, port: u16) {
        self.state.send_modify(|s| s.server_port = port);
    }

    /// New code arrived; it also becomes the current language
    pub fn update_code(&self, code: &str, language: &str) {
        self.set_language(language);
        info!("Panel received {} bytes of {} code", code.len(), language);
        self.publish(PanelEvent::UpdateCode {
            code: code.to_string(),
            language: language.to_string(),
        });
    }

    /// Run code, defaulting to the current language; returns the reported output
    pub async fn run_code(&self, code: &str, language: Option<&str>) -> String {
        let language = match language {
            Some(l) if !l.is_empty() => l.to_string(),
            _ => self.current_language(),
        };
        self.dispatcher.run(code, &language, self).await
    }

    /// Clear displayed output without touching the dispatcher
    pub fn clear_code(&self) {
        self.publish(PanelEvent::ClearOutput);
    }

    pub fn change_language(&self, language: &str) {
        debug!("Panel language changed to {}", language);
        self.set_language(language);
        self.state.send_modify(|s| s.language = language.to_string());
    }

    /// Apply a UI message; returns the output for `runCode`
    pub async fn handle_message(&self, message: PanelMessage) -> Option<String> {
        match message {
            PanelMessage::RunCode { code, language } => {
                Some(self.run_code(&code, language.as_deref()).await)
            }
            PanelMessage::ClearCode => {
                self.clear_code();
                None
            }
            PanelMessage::ChangeLanguage { language } => {
                self.change_language(&language);
                None
            }
        }
    }

    fn set_language(&self, language: &str) {
        *lock(&self.current_language) = language.to_string();
    }

    fn publish(&self, event: PanelEvent) {
        self.state.send_modify(|s| {
            match &event {
                PanelEvent::UpdateCode { code, language } => {
                    s.code = code.clone();
                    s.language = language.clone();
                }
                PanelEvent::UpdateOutput { output } => s.output = output.clone(),
                PanelEvent::ClearOutput => s.output.clear(),
            }
            s.revision += 1;
            s.last_event = Some(event);
        });
    }
}

impl OutputSink for Panel {
    fn update_output(&self, output: &str) {
        self.publish(PanelEvent::UpdateOutput {
            output: output.to_string(),
        });
    }
}

impl CodeReceiver for Panel {
    fn on_code_received(&self, code: String, language: String) {
        self.update_code(&code, &language);
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
