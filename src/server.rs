//! HTTP ingress - receives code over a local endpoint
//!
//! Two payload shapes are accepted:
//! - `POST /code`: plain text, or legacy `lang=<l>&code=<c>` percent-encoded text
//! - `POST /code-with-language`: JSON `{"code": ..., "language": ...}`
//!
//! When a panel is attached its UI is served under `/panel`.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::panel::{Panel, PanelMessage, PanelSnapshot};

/// Embedded panel HTML
const PANEL_HTML: &str = include_str!("../static/panel.html");

/// Language assumed when the sender does not name one
pub const DEFAULT_LANGUAGE: &str = "javascript";

const RECEIVED: &str = "✅ Code received";
const INVALID_TEXT: &str = "❌ Invalid code format. Please send plain text or URL-encoded data.";
const INVALID_JSON: &str =
    "❌ Invalid JSON format. Please send JSON with 'code' and 'language' string properties.";

/// Consumer of code arriving over HTTP
pub trait CodeReceiver: Send + Sync {
    fn on_code_received(&self, code: String, language: String);
}

// ---- Payload parsing ----

/// Split a `/code` text body into `(code, language)`.
///
/// Bodies of the form `lang=<l>&code=<c>` are percent-decoded; anything else
/// is taken verbatim as JavaScript. If only the code fails to decode, the body
/// is kept verbatim under the decoded language.
pub fn parse_text_payload(body: &str) -> (String, String) {
    if body.starts_with("lang=") && body.contains("&code=") {
        let parts: Vec<&str> = body.split('&').collect();
        let lang_part = parts.iter().find(|p| p.starts_with("lang="));
        let code_part = parts.iter().find(|p| p.starts_with("code="));

        if let (Some(lang), Some(code)) = (lang_part, code_part) {
            // The language is taken as soon as it decodes, even if the code does not
            let language = match urlencoding::decode(&lang[5..]) {
                Ok(lang) => lang.into_owned(),
                Err(_) => {
                    warn!("Error parsing code and language from URL-encoded data.");
                    return (body.to_string(), DEFAULT_LANGUAGE.to_string());
                }
            };
            match urlencoding::decode(&code[5..]) {
                Ok(code) => return (code.into_owned(), language),
                Err(_) => {
                    warn!("Error parsing code and language from URL-encoded data.");
                    return (body.to_string(), language);
                }
            }
        }
    }

    (body.to_string(), DEFAULT_LANGUAGE.to_string())
}

/// Extract `(code, language)` from a `/code-with-language` JSON body
pub fn parse_json_payload(body: &[u8]) -> Option<(String, String)> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    let code = value.get("code")?.as_str()?;
    let language = value.get("language")?.as_str()?;
    let code = urlencoding::decode(code).ok()?;
    Some((code.into_owned(), language.to_string()))
}

// ---- Error Handling ----

struct Rejection(&'static str);

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.0).into_response()
    }
}

// ---- Handlers ----

#[derive(Clone)]
struct IngressState {
    receiver: Arc<dyn CodeReceiver>,
}

async fn index() -> &'static str {
    "RunCodeLocally server is running"
}

async fn receive_code(
    State(state): State<IngressState>,
    headers: HeaderMap,
    body: Bytes,
) -> std::result::Result<&'static str, Rejection> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v.starts_with("application/json"));
    if is_json {
        warn!("Rejected JSON body on /code");
        return Err(Rejection(INVALID_TEXT));
    }

    let text = std::str::from_utf8(&body).map_err(|_| Rejection(INVALID_TEXT))?;
    let (code, language) = parse_text_payload(text);
    state.receiver.on_code_received(code, language);
    Ok(RECEIVED)
}

async fn receive_code_with_language(
    State(state): State<IngressState>,
    body: Bytes,
) -> std::result::Result<&'static str, Rejection> {
    let (code, language) = parse_json_payload(&body).ok_or_else(|| {
        warn!("Rejected malformed /code-with-language payload");
        Rejection(INVALID_JSON)
    })?;
    state.receiver.on_code_received(code, language);
    Ok(RECEIVED)
}

#[derive(Serialize)]
struct MessageResponse {
    output: Option<String>,
}

async fn serve_panel() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], PANEL_HTML)
}

async fn panel_state(State(panel): State<Arc<Panel>>) -> Json<PanelSnapshot> {
    Json(panel.snapshot())
}

async fn panel_message(
    State(panel): State<Arc<Panel>>,
    Json(message): Json<PanelMessage>,
) -> Json<MessageResponse> {
    let output = panel.handle_message(message).await;
    Json(MessageResponse { output })
}

// ---- Router ----

/// Ingress routes feeding `receiver`
pub fn ingress_routes(receiver: Arc<dyn CodeReceiver>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/code", post(receive_code))
        .route("/code-with-language", post(receive_code_with_language))
        .with_state(IngressState { receiver })
}

/// Panel UI routes, to be nested under `/panel`
pub fn panel_routes(panel: Arc<Panel>) -> Router {
    Router::new()
        .route("/", get(serve_panel))
        .route("/state", get(panel_state))
        .route("/message", post(panel_message))
        .with_state(panel)
}

/// Full application router: ingress wired to the panel, plus the panel UI
pub fn build_router(panel: Arc<Panel>) -> Router {
    let receiver: Arc<dyn CodeReceiver> = panel.clone();
    ingress_routes(receiver)
        .nest("/panel", panel_routes(panel))
        .layer(CorsLayer::permissive())
}

// ---- Server ----

struct RunningServer {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Owns the listening socket and its lifecycle
pub struct CodeReceiverServer {
    bind: String,
    port: u16,
    router: Router,
    running: Option<RunningServer>,
}

impl CodeReceiverServer {
    pub fn new(config: &ServerConfig, router: Router) -> Self {
        CodeReceiverServer {
            bind: config.bind.clone(),
            port: config.port,
            router,
            running: None,
        }
    }

    /// Bind and start serving in the background
    pub async fn start(&mut self) -> Result<SocketAddr> {
        if let Some(running) = &self.running {
            return Ok(running.local_addr);
        }

        let addr = format!("{}:{}", self.bind, self.port);
        let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                Error::Server(format!(
                    "Port {} is already in use. Please change the port in settings.",
                    self.port
                ))
            } else {
                Error::Server(format!("Failed to bind {}: {}", addr, e))
            }
        })?;
        let local_addr = listener.local_addr()?;

        let (shutdown, rx) = oneshot::channel::<()>();
        let app = self.router.clone();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async {
                rx.await.ok();
            });
            if let Err(e) = serve.await {
                warn!("Server error: {}", e);
            }
        });

        info!("Server started on port {}", local_addr.port());
        self.running = Some(RunningServer {
            local_addr,
            shutdown,
            task,
        });
        Ok(local_addr)
    }

    /// Stop serving and wait for in-flight requests to finish
    pub async fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            let _ = running.shutdown.send(());
            if let Err(e) = running.task.await {
                warn!("Server task ended abnormally: {}", e);
            }
            info!("Server stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Configured port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Actual bound address while running
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(String, String)>>);

    impl CodeReceiver for Recorder {
        fn on_code_received(&self, code: String, language: String) {
            self.0.lock().unwrap().push((code, language));
        }
    }

    async fn post(router: Router, uri: &str, content_type: &str, body: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(
                Request::post(uri)
                    .header(header::CONTENT_TYPE, content_type)
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn test_parse_text_payload() {
        assert_eq!(
            parse_text_payload("console.log(1)"),
            ("console.log(1)".to_string(), "javascript".to_string())
        );
        assert_eq!(
            parse_text_payload("lang=python&code=print(%22hi%22)%0Aprint(1%2B1)"),
            ("print(\"hi\")\nprint(1+1)".to_string(), "python".to_string())
        );
        // `+` is kept literally
        assert_eq!(
            parse_text_payload("lang=js&code=1+1").0,
            "1+1".to_string()
        );
        // needs both markers
        assert_eq!(parse_text_payload("lang=python").1, "javascript");
        // undecodable code keeps the raw body but not the default language
        assert_eq!(
            parse_text_payload("lang=python&code=%FF"),
            ("lang=python&code=%FF".to_string(), "python".to_string())
        );
        // undecodable language falls back to javascript
        assert_eq!(
            parse_text_payload("lang=%FF&code=1"),
            ("lang=%FF&code=1".to_string(), "javascript".to_string())
        );
    }

    #[test]
    fn test_parse_json_payload() {
        assert_eq!(
            parse_json_payload(br#"{"code":"puts%201","language":"ruby"}"#),
            Some(("puts 1".to_string(), "ruby".to_string()))
        );
        assert_eq!(parse_json_payload(br#"{"code":"1"}"#), None);
        assert_eq!(parse_json_payload(br#"{"code":1,"language":"js"}"#), None);
        assert_eq!(parse_json_payload(b"not json"), None);
    }

    #[tokio::test]
    async fn test_code_endpoint() {
        let recorder = Arc::new(Recorder::default());
        let router = ingress_routes(recorder.clone());

        let (status, body) = post(router.clone(), "/code", "text/plain", "lang=go&code=package%20main").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, RECEIVED);

        let (status, body) = post(router, "/code", "application/json", r#"{"code":"1"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, INVALID_TEXT);

        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec![("package main".to_string(), "go".to_string())]
        );
    }

    #[tokio::test]
    async fn test_code_with_language_endpoint() {
        let recorder = Arc::new(Recorder::default());
        let router = ingress_routes(recorder.clone());

        let (status, _) = post(
            router.clone(),
            "/code-with-language",
            "application/json",
            r#"{"code":"print(1)","language":"python"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = post(router, "/code-with-language", "application/json", r#"{"language":"python"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, INVALID_JSON);

        assert_eq!(recorder.0.lock().unwrap().len(), 1);
    }

    fn panel(temp: &std::path::Path) -> Arc<Panel> {
        use crate::runner::{Dispatcher, ProcessLauncher, RunnerRegistry, UnitManager};
        let dispatcher = Dispatcher::new(
            RunnerRegistry::builtin(),
            UnitManager::new(temp),
            Arc::new(ProcessLauncher::new()),
        );
        Arc::new(Panel::new(Arc::new(dispatcher), DEFAULT_LANGUAGE, 9009))
    }

    async fn get_json(router: Router, uri: &str) -> serde_json::Value {
        let response = router
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_non_utf8_code_body_rejected() {
        let recorder = Arc::new(Recorder::default());
        let response = ingress_routes(recorder.clone())
            .oneshot(
                Request::post("/code")
                    .header(header::CONTENT_TYPE, "text/plain")
                    .body(Body::from(vec![0xff, 0xfe]))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], INVALID_TEXT.as_bytes());
        assert!(recorder.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_panel_message_and_state() {
        let dir = tempfile::tempdir().unwrap();
        let router = build_router(panel(dir.path()));

        let (status, body) = post(
            router.clone(),
            "/panel/message",
            "application/json",
            r#"{"command":"runCode","code":"   "}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body, serde_json::json!({"output": "No code to run."}));

        let (status, body) = post(
            router.clone(),
            "/panel/message",
            "application/json",
            r#"{"command":"clearCode"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"output":null}"#);

        let (status, _) = post(
            router.clone(),
            "/code",
            "text/plain",
            "lang=ruby&code=puts%201",
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let state = get_json(router, "/panel/state").await;
        assert_eq!(state["code"], "puts 1");
        assert_eq!(state["language"], "ruby");
        assert_eq!(state["output"], "");
        assert_eq!(state["server_port"], 9009);
        assert_eq!(state["revision"], 3);
        assert_eq!(
            state["last_event"],
            serde_json::json!({"command": "updateCode", "code": "puts 1", "language": "ruby"})
        );
    }

    #[tokio::test]
    async fn test_panel_page_served() {
        let dir = tempfile::tempdir().unwrap();
        let response = build_router(panel(dir.path()))
            .oneshot(Request::get("/panel").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn test_index() {
        let router = ingress_routes(Arc::new(Recorder::default()));
        let response = router
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_start_stop_and_port_in_use() {
        let config = ServerConfig {
            port: 0,
            bind: "127.0.0.1".to_string(),
        };
        let mut server = CodeReceiverServer::new(&config, ingress_routes(Arc::new(Recorder::default())));
        assert!(!server.is_running());

        let addr = server.start().await.unwrap();
        assert!(server.is_running());
        assert_eq!(server.local_addr(), Some(addr));

        let taken = ServerConfig {
            port: addr.port(),
            bind: "127.0.0.1".to_string(),
        };
        let mut second = CodeReceiverServer::new(&taken, ingress_routes(Arc::new(Recorder::default())));
        let err = second.start().await.unwrap_err();
        assert!(err.to_string().contains("already in use"));
        assert!(!second.is_running());

        server.stop().await;
        assert!(!server.is_running());
        assert_eq!(server.local_addr(), None);
    }
}
