//! Multipart endpoints: document conversion and image compression.

use super::error::ApiError;
use super::AppState;
use crate::compress::{self, CompressError};
use axum::{
    body::Bytes,
    extract::{Multipart, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use std::collections::HashMap;

/// Parsed multipart form: at most one `file` part plus plain text fields.
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<(String, Bytes)>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            if name == "file" {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                form.file = Some((file_name, bytes));
            } else if !name.is_empty() {
                form.fields.insert(name, field.text().await?);
            }
        }
        Ok(form)
    }

    fn field(&self, name: &str) -> &str {
        self.fields.get(name).map_or("", |v| v.trim())
    }
}

fn header_value(value: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(value)
        .map_err(|e| ApiError::internal("Invalid response header").with_detail(e.to_string()))
}

/// POST /api/convert: multipart `file` + `outputFormat`.
pub async fn handle_convert(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = UploadForm::read(multipart).await?;
    let target = form.field("outputFormat").to_string();
    let (file_name, bytes) = form.file.unwrap_or_default();

    let converted = state
        .converter
        .convert(&file_name, bytes.to_vec(), &target)
        .await?;

    let disposition = format!("attachment; filename={}", converted.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, header_value(&converted.content_type)?),
            (header::CONTENT_DISPOSITION, header_value(&disposition)?),
        ],
        converted.bytes,
    )
        .into_response())
}

fn parse_target_kb(raw: &str) -> Result<usize, ApiError> {
    if raw.is_empty() {
        return Err(ApiError::bad_request("Missing targetSizeKB"));
    }
    let kb: usize = raw
        .parse()
        .map_err(|_| ApiError::bad_request("targetSizeKB must be a whole number of kilobytes"))?;
    Ok(kb.saturating_mul(1024))
}

/// POST /api/compress-image: multipart `file` + `targetSizeKB`.
pub async fn handle_compress(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = UploadForm::read(multipart).await?;
    let target_bytes = parse_target_kb(form.field("targetSizeKB"))?;
    let (_, bytes) = form.file.unwrap_or_default();

    // Size is rejected here so oversized uploads never reach the blocking pool.
    let settings = state.compress;
    if bytes.len() > settings.max_input_bytes {
        return Err(CompressError::TooLarge {
            size: bytes.len(),
            max: settings.max_input_bytes,
        }
        .into());
    }

    let outcome = tokio::task::spawn_blocking(move || {
        compress::compress_to_target(&bytes, target_bytes, &settings)
    })
    .await
    .map_err(|e| ApiError::internal("Compression failed").with_detail(e.to_string()))??;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("image/jpeg")),
            (
                header::HeaderName::from_static("x-compression-quality"),
                HeaderValue::from(u16::from(outcome.quality)),
            ),
            (
                header::HeaderName::from_static("x-compression-fits"),
                HeaderValue::from_static(if outcome.fits_target { "true" } else { "false" }),
            ),
        ],
        outcome.bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_kb_is_converted_to_bytes() {
        assert_eq!(parse_target_kb("500").unwrap(), 512_000);
        assert_eq!(parse_target_kb("0").unwrap(), 0);
    }

    #[test]
    fn target_kb_must_be_a_number() {
        assert!(parse_target_kb("").is_err());
        assert!(parse_target_kb("12kb").is_err());
        assert!(parse_target_kb("-5").is_err());
    }
}
