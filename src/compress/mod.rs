//! JPEG re-encoding toward a target byte size.
//!
//! Quality is bisected inside `[min_quality, max_quality]` for a bounded
//! number of rounds. The highest quality that fits wins; when nothing fits,
//! the smallest encoding seen is returned and flagged as not fitting.

use crate::config::CompressConfig;
use crate::convert::raster;
use image::DynamicImage;

#[derive(Debug, thiserror::Error)]
pub enum CompressError {
    #[error("No image provided")]
    EmptyInput,

    #[error("Target size must be greater than zero")]
    InvalidTarget,

    #[error("Image exceeds the {max} byte upload limit ({size} bytes)")]
    TooLarge { size: usize, max: usize },

    #[error("Could not decode image: {0}")]
    Decode(String),

    #[error("JPEG encoding failed: {0}")]
    Encode(String),
}

impl CompressError {
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Encode(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressSettings {
    pub min_quality: u8,
    pub max_quality: u8,
    pub iterations: u32,
    pub max_input_bytes: usize,
}

impl CompressSettings {
    pub fn from_config(config: &CompressConfig, max_input_bytes: usize) -> Self {
        Self {
            min_quality: config.min_quality,
            max_quality: config.max_quality,
            iterations: config.iterations,
            max_input_bytes,
        }
    }
}

impl Default for CompressSettings {
    fn default() -> Self {
        Self::from_config(&CompressConfig::default(), 50 * 1024 * 1024)
    }
}

#[derive(Debug, Clone)]
pub struct CompressOutcome {
    pub bytes: Vec<u8>,
    pub quality: u8,
    /// Encodings actually performed.
    pub iterations: u32,
    pub fits_target: bool,
}

/// Produces an encoding of a fixed source image at a given quality.
pub trait QualityEncoder {
    fn encode(&self, quality: u8) -> Result<Vec<u8>, CompressError>;
}

/// [`QualityEncoder`] over a decoded raster image.
pub struct JpegQualityEncoder {
    image: DynamicImage,
}

impl JpegQualityEncoder {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CompressError> {
        let image =
            image::load_from_memory(bytes).map_err(|e| CompressError::Decode(e.to_string()))?;
        Ok(Self { image })
    }
}

impl QualityEncoder for JpegQualityEncoder {
    fn encode(&self, quality: u8) -> Result<Vec<u8>, CompressError> {
        raster::encode_jpeg(&self.image, quality).map_err(|e| CompressError::Encode(e.to_string()))
    }
}

/// Bisect quality until the encoding fits `target_bytes` or the rounds run out.
pub fn bisect_quality(
    encoder: &dyn QualityEncoder,
    target_bytes: usize,
    settings: &CompressSettings,
) -> Result<CompressOutcome, CompressError> {
    if target_bytes == 0 {
        return Err(CompressError::InvalidTarget);
    }

    let mut lo = i32::from(settings.min_quality);
    let mut hi = i32::from(settings.max_quality);
    let mut best: Option<(u8, Vec<u8>)> = None;
    let mut smallest: Option<(u8, Vec<u8>)> = None;
    let mut rounds = 0u32;

    while rounds < settings.iterations && lo <= hi {
        let quality = u8::try_from((lo + hi) / 2).unwrap_or(settings.max_quality);
        let encoded = encoder.encode(quality)?;
        rounds += 1;
        tracing::debug!(quality, size = encoded.len(), target_bytes, "Compression round");

        if encoded.len() <= target_bytes {
            lo = i32::from(quality) + 1;
            best = Some((quality, encoded));
        } else {
            hi = i32::from(quality) - 1;
            if smallest.as_ref().is_none_or(|(_, s)| encoded.len() < s.len()) {
                smallest = Some((quality, encoded));
            }
        }
    }

    let (fits_target, (quality, bytes)) = match (best, smallest) {
        (Some(best), _) => (true, best),
        (None, Some(smallest)) => (false, smallest),
        (None, None) => return Err(CompressError::Encode("no encoding attempted".into())),
    };
    Ok(CompressOutcome {
        bytes,
        quality,
        iterations: rounds,
        fits_target,
    })
}

/// Decode `image_bytes` once and bisect JPEG quality toward `target_bytes`.
///
/// Size and target are checked before the image is decoded.
pub fn compress_to_target(
    image_bytes: &[u8],
    target_bytes: usize,
    settings: &CompressSettings,
) -> Result<CompressOutcome, CompressError> {
    if image_bytes.is_empty() {
        return Err(CompressError::EmptyInput);
    }
    if image_bytes.len() > settings.max_input_bytes {
        return Err(CompressError::TooLarge {
            size: image_bytes.len(),
            max: settings.max_input_bytes,
        });
    }
    if target_bytes == 0 {
        return Err(CompressError::InvalidTarget);
    }

    let encoder = JpegQualityEncoder::from_bytes(image_bytes)?;
    let outcome = bisect_quality(&encoder, target_bytes, settings)?;
    tracing::info!(
        input_bytes = image_bytes.len(),
        output_bytes = outcome.bytes.len(),
        target_bytes,
        quality = outcome.quality,
        rounds = outcome.iterations,
        fits = outcome.fits_target,
        "Image compressed"
    );
    Ok(outcome)
}
