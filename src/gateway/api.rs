//! JSON handlers for the `/api/*` tools.

use super::error::ApiError;
use super::AppState;
use crate::tools::{base64_codec, palette, password, qr};
use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

type ApiResult = Result<Json<Value>, ApiError>;

// ── Request bodies ──────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ChatBody {
    #[serde(default)]
    pub text: String,
}

#[derive(Deserialize)]
pub struct ShortenBody {
    #[serde(default)]
    pub long_url: String,
}

#[derive(Deserialize)]
pub struct Base64Body {
    pub mode: base64_codec::Base64Mode,
    #[serde(default)]
    pub input: String,
}

// ── Handlers ────────────────────────────────────────────────────

/// POST /api/chat
pub async fn handle_chat(
    State(state): State<AppState>,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body?;
    let reply = state.chat.respond(&body.text).await?;
    Ok(Json(json!({ "reply": reply })))
}

/// POST /api/shorturl
pub async fn handle_shorten(
    State(state): State<AppState>,
    body: Result<Json<ShortenBody>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body?;
    let short_url = state.shortener.shorten(&body.long_url).await?;
    tracing::info!(short_url = %short_url, "URL shortened");
    Ok(Json(json!({ "shortUrl": short_url })))
}

/// POST /api/qr
pub async fn handle_qr(
    State(state): State<AppState>,
    body: Result<Json<qr::QrRequest>, JsonRejection>,
) -> ApiResult {
    let Json(request) = body?;
    let code = qr::build(&request, &state.config.qr.api_url)?;
    Ok(Json(json!(code)))
}

/// POST /api/base64
pub async fn handle_base64(body: Result<Json<Base64Body>, JsonRejection>) -> ApiResult {
    let Json(body) = body?;
    let output = base64_codec::run(body.mode, &body.input)?;
    Ok(Json(json!({ "output": output })))
}

/// POST /api/password
pub async fn handle_password(
    body: Result<Json<password::PasswordOptions>, JsonRejection>,
) -> ApiResult {
    let Json(options) = body?;
    let generated = password::generate(&options)?;
    Ok(Json(json!(generated)))
}

/// POST /api/palette
pub async fn handle_palette(
    body: Result<Json<palette::PaletteRequest>, JsonRejection>,
) -> ApiResult {
    let Json(request) = body?;
    let generated = palette::generate(&request)?;
    Ok(Json(json!(generated)))
}

/// GET /api/convert
pub async fn handle_convert_info(State(state): State<AppState>) -> Json<Value> {
    Json(json!(state.converter.info()))
}
