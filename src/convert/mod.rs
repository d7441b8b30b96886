//! Document and image converter.
//!
//! Requests are checked against the static [`matrix`] before anything touches
//! disk. Accepted requests get a private `converter-<uuid>` workspace that is
//! removed when the conversion returns, whether it succeeded or not.

pub mod docx;
pub mod matrix;
pub mod office;
pub mod pdf;
pub mod raster;
pub mod sheet;
pub mod text;

pub use matrix::{Format, FormatCategory, UnknownFormat};

use crate::config::ConvertConfig;
use crate::runtime::CommandRunner;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

const MIB: usize = 1024 * 1024;

/// Render a byte limit the way users read it: `50MB`, or raw bytes when not whole.
pub fn human_size(bytes: usize) -> String {
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{bytes} bytes")
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn limit_text(max: &usize) -> String {
    human_size(*max)
}

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("File size exceeds {}", limit_text(.max))]
    TooLarge { size: usize, max: usize },

    #[error("Unsupported conversion: {from} to {to}")]
    Unsupported { from: String, to: String },

    #[error("{0}")]
    Malformed(String),

    #[error("{0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    /// Errors caused by the request rather than by the host.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_)
                | Self::TooLarge { .. }
                | Self::Unsupported { .. }
                | Self::Malformed(_)
        )
    }
}

/// Which implementation handles a matrix pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// `image` crate re-encode, or a JPEG page for pdf targets.
    Raster,
    /// Text layer via `pdf-extract`.
    PdfText,
    /// First page through `pdftoppm`.
    PdfRaster,
    Docx,
    Markdown,
    Html,
    Text,
    Csv,
    Json,
    /// LibreOffice headless.
    Office,
}

impl Backend {
    pub const ALL: [Backend; 10] = [
        Backend::Raster,
        Backend::PdfText,
        Backend::PdfRaster,
        Backend::Docx,
        Backend::Markdown,
        Backend::Html,
        Backend::Text,
        Backend::Csv,
        Backend::Json,
        Backend::Office,
    ];

    /// Library or binary behind the backend, as listed by `GET /api/convert`.
    pub fn tool(self) -> &'static str {
        match self {
            Backend::Raster => "image",
            Backend::PdfText => "pdf-extract",
            Backend::PdfRaster => "pdftoppm",
            Backend::Docx => "zip",
            Backend::Markdown => "pulldown-cmark",
            Backend::Html => "nanohtml2text",
            Backend::Text => "lopdf",
            Backend::Csv => "csv",
            Backend::Json => "serde_json",
            Backend::Office => "libreoffice",
        }
    }

    fn is_external(self) -> bool {
        matches!(self, Backend::PdfRaster | Backend::Office)
    }
}

/// Backend for `from -> to`, or `None` when the pair is not in the matrix.
pub fn backend_for(from: Format, to: Format) -> Option<Backend> {
    if !matrix::is_supported(from, to) {
        return None;
    }
    let backend = match from {
        f if f.is_image() => Backend::Raster,
        Format::Pdf if to.is_image() => Backend::PdfRaster,
        Format::Pdf => Backend::PdfText,
        Format::Docx => Backend::Docx,
        Format::Md => Backend::Markdown,
        Format::Html => Backend::Html,
        Format::Txt => Backend::Text,
        Format::Csv => Backend::Csv,
        Format::Json => Backend::Json,
        _ => Backend::Office,
    };
    Some(backend)
}

/// Distinct tools across all backends, in backend order.
pub fn tools_used() -> Vec<&'static str> {
    let mut tools: Vec<&'static str> = Vec::new();
    for backend in Backend::ALL {
        if !tools.contains(&backend.tool()) {
            tools.push(backend.tool());
        }
    }
    tools
}

/// Body of `GET /api/convert`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionInfo {
    pub supported_conversions: BTreeMap<&'static str, Vec<&'static str>>,
    pub max_file_size: String,
    pub tools_used: Vec<&'static str>,
}

#[derive(Debug, Clone)]
pub struct ConvertedFile {
    pub bytes: Vec<u8>,
    pub format: Format,
    pub content_type: String,
    /// Suggested download name, always `converted.<ext>`.
    pub file_name: String,
}

impl ConvertedFile {
    fn new(bytes: Vec<u8>, format: Format) -> Self {
        let ext = format.extension();
        Self {
            bytes,
            format,
            content_type: mime_guess::from_ext(ext)
                .first_or_octet_stream()
                .to_string(),
            file_name: format!("converted.{ext}"),
        }
    }
}

pub struct Converter {
    config: ConvertConfig,
    runner: Arc<dyn CommandRunner>,
    max_upload_bytes: usize,
}

impl Converter {
    pub fn new(
        config: ConvertConfig,
        runner: Arc<dyn CommandRunner>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            config,
            runner,
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    pub fn info(&self) -> ConversionInfo {
        ConversionInfo {
            supported_conversions: matrix::as_table(),
            max_file_size: human_size(self.max_upload_bytes),
            tools_used: tools_used(),
        }
    }

    /// Convert `bytes` (named `file_name`) into `target`.
    ///
    /// Validation order: missing input, size, then the matrix. No backend or
    /// external process runs unless all three pass.
    pub async fn convert(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        target: &str,
    ) -> Result<ConvertedFile, ConvertError> {
        let target = target.trim();
        if file_name.trim().is_empty() || bytes.is_empty() || target.is_empty() {
            return Err(ConvertError::InvalidInput(
                "Missing file or output format".into(),
            ));
        }
        if bytes.len() > self.max_upload_bytes {
            return Err(ConvertError::TooLarge {
                size: bytes.len(),
                max: self.max_upload_bytes,
            });
        }

        let from_ext = Format::extension_of(file_name);
        let to_ext = target.trim_start_matches('.').to_ascii_lowercase();
        let (from, to, backend) = match (from_ext.parse::<Format>(), to_ext.parse::<Format>()) {
            (Ok(from), Ok(to)) => match backend_for(from, to) {
                Some(backend) => (from, to, backend),
                None => return Err(unsupported(&from_ext, &to_ext)),
            },
            _ => return Err(unsupported(&from_ext, &to_ext)),
        };

        let started = Instant::now();
        let input_bytes = bytes.len();
        let workspace = self.workspace()?;
        let input_path = workspace.path().join(format!("input.{}", from.extension()));
        tokio::fs::write(&input_path, &bytes).await?;

        let result = if backend.is_external() {
            self.convert_external(backend, workspace.path(), &input_path, to)
                .await
        } else {
            tokio::task::spawn_blocking(move || convert_local(backend, to, &bytes))
                .await
                .map_err(|e| ConvertError::Backend(format!("conversion task failed: {e}")))?
        };
        // Explicit close so a failed removal is at least logged.
        if let Err(e) = workspace.close() {
            tracing::warn!("Failed to remove converter workspace: {e}");
        }

        let output = result?;
        tracing::info!(
            from = %from,
            to = %to,
            backend = backend.tool(),
            file = file_name,
            input_bytes,
            output_bytes = output.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Conversion finished"
        );
        Ok(ConvertedFile::new(output, to))
    }

    fn workspace(&self) -> Result<tempfile::TempDir, ConvertError> {
        let prefix = format!("converter-{}", uuid::Uuid::new_v4());
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix).rand_bytes(0);
        let dir = match &self.config.temp_dir {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    async fn convert_external(
        &self,
        backend: Backend,
        workdir: &Path,
        input: &Path,
        to: Format,
    ) -> Result<Vec<u8>, ConvertError> {
        let runner = self.runner.as_ref();
        match backend {
            Backend::PdfRaster => office::pdftoppm(runner, &self.config, workdir, input, to).await,
            _ => office::soffice(runner, &self.config, workdir, input, to).await,
        }
    }
}

fn unsupported(from: &str, to: &str) -> ConvertError {
    ConvertError::Unsupported {
        from: from.to_string(),
        to: to.to_string(),
    }
}

/// Write `text` as `to`. Shared tail of every text-producing backend.
fn text_output(text: &str, to: Format) -> Result<Vec<u8>, ConvertError> {
    match to {
        Format::Txt => Ok(text.as_bytes().to_vec()),
        Format::Pdf => pdf::text_to_pdf(text),
        Format::Docx => docx::from_text(text),
        Format::Html => Ok(text::text_to_html(text).into_bytes()),
        other => Err(ConvertError::Backend(format!("no text writer for {other}"))),
    }
}

fn convert_local(backend: Backend, to: Format, input: &[u8]) -> Result<Vec<u8>, ConvertError> {
    match backend {
        Backend::Raster => raster::convert(input, to),
        Backend::PdfText => text_output(&pdf::extract_text(input)?, to),
        Backend::Docx if to == Format::Html => Ok(docx::to_html(input)?.into_bytes()),
        Backend::Docx => text_output(&docx::to_text(input)?, to),
        Backend::Markdown => {
            let markdown = text::decode_utf8(input)?;
            if to == Format::Html {
                Ok(text::markdown_to_html(&markdown).into_bytes())
            } else {
                text_output(&markdown, to)
            }
        }
        Backend::Html => text_output(&text::html_to_text(&text::decode_utf8(input)?), to),
        Backend::Text => text_output(&text::decode_utf8(input)?, to),
        Backend::Csv if to == Format::Xlsx => sheet::csv_to_xlsx(input),
        Backend::Csv => text_output(&sheet::csv_to_text(input)?, to),
        Backend::Json if to == Format::Csv => sheet::json_to_csv(input),
        Backend::Json => text_output(&sheet::json_to_text(input)?, to),
        Backend::PdfRaster | Backend::Office => Err(ConvertError::Backend(format!(
            "{} runs out of process",
            backend.tool()
        ))),
    }
}
