//! JSON error responses for every handler.

use crate::chat::{ChatError, FALLBACK_REPLY};
use crate::compress::CompressError;
use crate::convert::ConvertError;
use crate::tools::shortener::ShortenError;
use crate::tools::ToolError;
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub detail: Option<String>,
    /// Chat fallback text shown to the user alongside the error.
    pub reply: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            detail: None,
            reply: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    #[must_use]
    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = Some(reply.into());
        self
    }

    fn body(&self) -> serde_json::Value {
        let mut body = serde_json::json!({ "error": self.message });
        if let Some(detail) = &self.detail {
            body["detail"] = serde_json::Value::String(detail.clone());
        }
        if let Some(reply) = &self.reply {
            body["reply"] = serde_json::Value::String(reply.clone());
        }
        body
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status.as_u16(), self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = self.status.as_u16(),
                detail = self.detail.as_deref().unwrap_or_default(),
                "Request failed: {}",
                self.message
            );
        } else {
            tracing::warn!(status = self.status.as_u16(), "Request rejected: {}", self.message);
        }
        (self.status, Json(self.body())).into_response()
    }
}

impl From<ConvertError> for ApiError {
    fn from(err: ConvertError) -> Self {
        match &err {
            ConvertError::TooLarge { .. } => {
                Self::new(StatusCode::PAYLOAD_TOO_LARGE, err.to_string())
            }
            e if e.is_client_error() => Self::bad_request(err.to_string()),
            _ => Self::internal("Conversion failed").with_detail(err.to_string()),
        }
    }
}

impl From<CompressError> for ApiError {
    fn from(err: CompressError) -> Self {
        match &err {
            CompressError::TooLarge { .. } => {
                Self::new(StatusCode::PAYLOAD_TOO_LARGE, err.to_string())
            }
            e if e.is_client_error() => Self::bad_request(err.to_string()),
            _ => Self::internal("Compression failed").with_detail(err.to_string()),
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        let message = err.to_string();
        match err {
            ChatError::EmptyMessage => Self::bad_request(message),
            ChatError::MissingApiKey => Self::internal(message),
            ChatError::Upstream(source) => Self::internal(message)
                .with_detail(crate::providers::sanitize_api_error(&format!("{source:#}")))
                .with_reply(FALLBACK_REPLY),
        }
    }
}

impl From<ShortenError> for ApiError {
    fn from(err: ShortenError) -> Self {
        match err {
            ShortenError::InvalidUrl(message) => Self::bad_request(message),
            ShortenError::Upstream(message) => Self::internal(message),
            ShortenError::Http(e) => Self::internal("Internal Error").with_detail(e.to_string()),
        }
    }
}

impl From<ToolError> for ApiError {
    fn from(err: ToolError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), "Invalid JSON body").with_detail(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        let status = err.status();
        let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
            "Upload exceeds the request size limit"
        } else {
            "Invalid multipart body"
        };
        Self::new(status, message).with_detail(err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn json_of(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn optional_fields_are_omitted() {
        let (status, body) = json_of(ApiError::bad_request("nope")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({"error": "nope"}));
    }

    #[tokio::test]
    async fn chat_upstream_failure_carries_fallback_reply() {
        let err: ApiError = ChatError::Upstream(anyhow::anyhow!("connection refused")).into();
        let (status, body) = json_of(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["reply"], FALLBACK_REPLY);
        assert_eq!(body["detail"], "connection refused");
    }

    #[test]
    fn convert_errors_map_to_status_codes() {
        let too_large: ApiError = ConvertError::TooLarge { size: 2, max: 1 }.into();
        assert_eq!(too_large.status, StatusCode::PAYLOAD_TOO_LARGE);

        let unsupported: ApiError = ConvertError::Unsupported {
            from: "png".into(),
            to: "docx".into(),
        }
        .into();
        assert_eq!(unsupported.status, StatusCode::BAD_REQUEST);
        assert_eq!(unsupported.message, "Unsupported conversion: png to docx");

        let backend: ApiError = ConvertError::Backend("soffice exited".into()).into();
        assert_eq!(backend.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(backend.detail.as_deref(), Some("soffice exited"));
    }

    #[test]
    fn compress_and_tool_errors_map_to_status_codes() {
        let too_large: ApiError = CompressError::TooLarge { size: 2, max: 1 }.into();
        assert_eq!(too_large.status, StatusCode::PAYLOAD_TOO_LARGE);
        let target: ApiError = CompressError::InvalidTarget.into();
        assert_eq!(target.status, StatusCode::BAD_REQUEST);
        let encode: ApiError = CompressError::Encode("boom".into()).into();
        assert_eq!(encode.status, StatusCode::INTERNAL_SERVER_ERROR);

        let tool: ApiError = ToolError::invalid("bad").into();
        assert_eq!(tool.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn shortener_errors_map_to_status_codes() {
        let invalid: ApiError = ShortenError::InvalidUrl("Missing URL".into()).into();
        assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
        let upstream: ApiError = ShortenError::Upstream("CleanURI down".into()).into();
        assert_eq!(upstream.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(upstream.message, "CleanURI down");
    }
}
