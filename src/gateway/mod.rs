//! Axum-based HTTP gateway with body limits and request timeouts.
//!
//! JSON routes share a small body limit. The two upload routes get their own
//! limit derived from `gateway.max_upload_bytes`, with headroom for multipart
//! framing so the per-file check can answer with a JSON 413.

pub mod api;
pub mod error;
pub mod upload;

pub use error::ApiError;

use crate::chat::ChatBot;
use crate::compress::CompressSettings;
use crate::config::Config;
use crate::convert::Converter;
use crate::providers::{self, ChatProvider};
use crate::runtime::{self, CommandRunner};
use crate::tools::shortener::Shortener;
use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Maximum JSON request body size (64KB)
pub const MAX_JSON_BODY_SIZE: usize = 65_536;
/// Allowance for multipart boundaries and text fields on upload routes.
pub const MULTIPART_OVERHEAD: usize = 65_536;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub converter: Arc<Converter>,
    pub chat: Arc<ChatBot>,
    pub shortener: Arc<Shortener>,
    pub compress: CompressSettings,
}

impl AppState {
    /// Wire the default process runner and chat provider for `config`.
    pub fn new(config: Config) -> Self {
        let provider = providers::create_chat_provider(&config.chat);
        Self::with_parts(config, runtime::create_runner(), provider)
    }

    /// Build state around an explicit runner and provider.
    pub fn with_parts(
        config: Config,
        runner: Arc<dyn CommandRunner>,
        provider: Arc<dyn ChatProvider>,
    ) -> Self {
        let max_upload = config.gateway.max_upload_bytes;
        Self {
            converter: Arc::new(Converter::new(config.convert.clone(), runner, max_upload)),
            chat: Arc::new(ChatBot::new(provider)),
            shortener: Arc::new(Shortener::new(&config.shortener)),
            compress: CompressSettings::from_config(&config.compress, max_upload),
            config: Arc::new(config),
        }
    }
}

/// All routes with their body limits and the request timeout applied.
pub fn build_router(state: AppState) -> Router {
    let upload_limit = state
        .config
        .gateway
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD);
    let timeout = Duration::from_secs(state.config.gateway.request_timeout_secs);

    let upload_router = Router::new()
        .route("/api/convert", post(upload::handle_convert))
        .route("/api/compress-image", post(upload::handle_compress))
        .layer(DefaultBodyLimit::max(upload_limit));

    let json_router = Router::new()
        .route("/health", get(handle_health))
        .route("/api/convert", get(api::handle_convert_info))
        .route("/api/chat", post(api::handle_chat))
        .route("/api/shorturl", post(api::handle_shorten))
        .route("/api/qr", post(api::handle_qr))
        .route("/api/base64", post(api::handle_base64))
        .route("/api/password", post(api::handle_password))
        .route("/api/palette", post(api::handle_palette))
        .layer(RequestBodyLimitLayer::new(MAX_JSON_BODY_SIZE));

    Router::new()
        .merge(upload_router)
        .merge(json_router)
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
}

/// Run the HTTP gateway until Ctrl+C.
pub async fn run_gateway(config: Config) -> Result<()> {
    let host = config.gateway.host.clone();
    let port = config.gateway.port;
    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("Failed to bind gateway to {host}:{port}"))?;
    let actual_port = listener.local_addr()?.port();

    let state = AppState::new(config);
    tracing::info!(
        host = %host,
        port = actual_port,
        max_upload_bytes = state.config.gateway.max_upload_bytes,
        chat_provider = state.chat.provider_name(),
        "Gateway listening"
    );
    println!("🧰 ToolBox gateway listening on http://{host}:{actual_port}");
    println!("  Press Ctrl+C to stop.\n");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Gateway server error")?;

    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}

/// GET /health
async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[test]
    fn json_body_limit_is_64kb() {
        assert_eq!(MAX_JSON_BODY_SIZE, 65_536);
    }

    #[test]
    fn app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[tokio::test]
    async fn health_reports_version() {
        let app = build_router(AppState::new(Config::default()));
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn oversized_json_body_is_rejected() {
        let app = build_router(AppState::new(Config::default()));
        let payload = format!(
            r#"{{"mode":"encode","input":"{}"}}"#,
            "a".repeat(MAX_JSON_BODY_SIZE)
        );
        let response = app
            .oneshot(
                Request::post("/api/base64")
                    .header("content-type", "application/json")
                    .header("content-length", payload.len())
                    .body(Body::from(payload))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn state_applies_upload_limit_to_compressor() {
        let mut config = Config::default();
        config.gateway.max_upload_bytes = 1234;
        let state = AppState::new(config);
        assert_eq!(state.compress.max_input_bytes, 1234);
        assert_eq!(state.converter.max_upload_bytes(), 1234);
    }
}
