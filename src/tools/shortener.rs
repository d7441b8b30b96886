//! URL shortening relayed to a cleanuri-compatible service.

use crate::config::ShortenerConfig;
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ShortenError {
    #[error("{0}")]
    InvalidUrl(String),

    #[error("{0}")]
    Upstream(String),

    #[error("Shortening service unreachable: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct ShortenResponse {
    #[serde(default)]
    result_url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Accept only absolute http(s) URLs with a host, no userinfo and no embedded whitespace.
pub fn validate_long_url(raw: &str) -> Result<String, ShortenError> {
    let url = raw.trim();
    if url.is_empty() {
        return Err(ShortenError::InvalidUrl("Missing URL".into()));
    }
    if url.chars().any(char::is_whitespace) {
        return Err(ShortenError::InvalidUrl("URL cannot contain whitespace".into()));
    }

    let lower = url.to_ascii_lowercase();
    let rest = lower
        .strip_prefix("http://")
        .or_else(|| lower.strip_prefix("https://"))
        .ok_or_else(|| {
            ShortenError::InvalidUrl("Only http:// and https:// URLs can be shortened".into())
        })?;
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if authority.contains('@') {
        return Err(ShortenError::InvalidUrl(
            "URL must not contain user credentials".into(),
        ));
    }
    let host = authority.split(':').next().unwrap_or_default();
    if host.is_empty() && !authority.starts_with('[') {
        return Err(ShortenError::InvalidUrl("URL must include a host".into()));
    }

    Ok(url.to_string())
}

pub struct Shortener {
    api_url: String,
    client: Client,
}

impl Shortener {
    pub fn new(config: &ShortenerConfig) -> Self {
        Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            client: crate::config::build_upstream_client("shortener", config.timeout_secs, 10),
        }
    }

    pub async fn shorten(&self, long_url: &str) -> Result<String, ShortenError> {
        let url = validate_long_url(long_url)?;

        let response = self
            .client
            .post(format!("{}/api/v1/shorten", self.api_url))
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(format!("url={}", urlencoding::encode(&url)))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let parsed: Option<ShortenResponse> = serde_json::from_str(&body).ok();

        let upstream_error = parsed.as_ref().and_then(|r| r.error.clone());
        if !status.is_success() || upstream_error.is_some() {
            let message = upstream_error.unwrap_or_else(|| {
                format!(
                    "Shortening service error ({status}): {}",
                    crate::providers::sanitize_api_error(&body)
                )
            });
            tracing::warn!(%status, "URL shortening failed: {message}");
            return Err(ShortenError::Upstream(message));
        }

        parsed
            .and_then(|r| r.result_url)
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| ShortenError::Upstream("Shortening service returned no URL".into()))
    }
}
