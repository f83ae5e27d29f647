//! Application context - owns the panel and server for the process
//!
//! Lifecycle contract:
//! - the panel is created on first use and reused afterwards
//! - the server is started at most once; starting again reports the port
//! - stopping tears the server down; the panel survives until closed

use std::sync::{Arc, Mutex};
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::panel::Panel;
use crate::runner::Dispatcher;
use crate::server::{build_router, CodeReceiverServer};

pub struct AppContext {
    config: Config,
    dispatcher: Arc<Dispatcher>,
    panel: Mutex<Option<Arc<Panel>>>,
    server: tokio::sync::Mutex<Option<CodeReceiverServer>>,
}

impl AppContext {
    /// Context running code with local toolchains
    pub fn new(config: Config) -> Self {
        let dispatcher = Dispatcher::from_config(&config.runner);
        AppContext::with_dispatcher(config, dispatcher)
    }

    pub fn with_dispatcher(config: Config, dispatcher: Dispatcher) -> Self {
        AppContext {
            config,
            dispatcher: Arc::new(dispatcher),
            panel: Mutex::new(None),
            server: tokio::sync::Mutex::new(None),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Create the panel, or reveal the existing one with its language reset
    pub fn show_panel(&self) -> Arc<Panel> {
        let port = self.config.server.port;
        let language = &self.config.runner.default_language;
        let mut slot = self.panel.lock().unwrap_or_else(|p| p.into_inner());

        if let Some(panel) = slot.as_ref() {
            panel.reveal(port, language);
            return panel.clone();
        }

        let panel = Arc::new(Panel::new(self.dispatcher.clone(), language, port));
        *slot = Some(panel.clone());
        panel
    }

    pub fn current_panel(&self) -> Option<Arc<Panel>> {
        self.panel.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Drop the panel; the next `show_panel` creates a fresh one
    pub fn close_panel(&self) {
        self.panel.lock().unwrap_or_else(|p| p.into_inner()).take();
    }

    /// Start the server wired to the panel; returns a user-facing notice
    pub async fn start_server(&self) -> Result<String> {
        let mut slot = self.server.lock().await;

        if let Some(server) = slot.as_ref().filter(|s| s.is_running()) {
            let port = server.local_addr().map_or(server.port(), |a| a.port());
            let notice = format!("Server is already running on port {}", port);
            info!("{}", notice);
            return Ok(notice);
        }

        let panel = self.show_panel();
        let mut server = CodeReceiverServer::new(&self.config.server, build_router(panel.clone()));
        let addr = server.start().await?;
        panel.set_server_port(addr.port());
        *slot = Some(server);

        Ok(format!("Server started on port {}", addr.port()))
    }

    /// Stop the server if one is running; returns a user-facing notice
    pub async fn stop_server(&self) -> Result<String> {
        let mut slot = self.server.lock().await;

        match slot.take() {
            Some(mut server) if server.is_running() => {
                server.stop().await;
                Ok("Server stopped".to_string())
            }
            _ => {
                info!("No server is running");
                Ok("No server is running".to_string())
            }
        }
    }

    pub async fn is_server_running(&self) -> bool {
        self.server
            .lock()
            .await
            .as_ref()
            .map_or(false, |s| s.is_running())
    }

    pub async fn server_addr(&self) -> Option<std::net::SocketAddr> {
        self.server.lock().await.as_ref().and_then(|s| s.local_addr())
    }

    /// Stop anything still running
    pub async fn shutdown(&self) {
        let mut slot = self.server.lock().await;
        if let Some(mut server) = slot.take() {
            server.stop().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn context(temp: &std::path::Path) -> AppContext {
        let mut config = Config::default();
        config.server.port = 0;
        config.runner.temp_dir = Some(temp.to_path_buf());
        AppContext::new(config)
    }

    #[test]
    fn test_panel_is_reused() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());
        assert!(ctx.current_panel().is_none());

        let first = ctx.show_panel();
        first.change_language("ruby");
        let second = ctx.show_panel();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.current_language(), "javascript");

        ctx.close_panel();
        assert!(ctx.current_panel().is_none());
    }

    #[tokio::test]
    async fn test_server_lifecycle() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());

        assert_eq!(ctx.stop_server().await.unwrap(), "No server is running");

        let started = ctx.start_server().await.unwrap();
        assert!(started.starts_with("Server started on port"));
        assert!(ctx.is_server_running().await);
        assert!(ctx.current_panel().is_some());

        let port = ctx.server_addr().await.unwrap().port();
        assert_eq!(
            ctx.start_server().await.unwrap(),
            format!("Server is already running on port {}", port)
        );

        assert_eq!(ctx.stop_server().await.unwrap(), "Server stopped");
        assert!(!ctx.is_server_running().await);

        ctx.start_server().await.unwrap();
        ctx.shutdown().await;
        assert!(!ctx.is_server_running().await);
    }

    #[tokio::test]
    async fn test_received_code_reaches_panel() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());
        ctx.start_server().await.unwrap();
        let addr = ctx.server_addr().await.unwrap();

        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        let response = client
            .post(format!("http://{}/code", addr))
            .header("Content-Type", "text/plain")
            .body("lang=python&code=print(1)")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(response.text().await.unwrap(), "✅ Code received");

        let state: serde_json::Value = client
            .get(format!("http://{}/panel/state", addr))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(state["code"], "print(1)");
        assert_eq!(state["server_port"], addr.port());

        let panel = ctx.current_panel().unwrap();
        let snapshot = panel.snapshot();
        assert_eq!(snapshot.code, "print(1)");
        assert_eq!(snapshot.language, "python");
        assert_eq!(panel.current_language(), "python");

        ctx.shutdown().await;
    }
}
