use super::{pdf, ConvertError, Format};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// Quality used when an image conversion targets JPEG.
const JPEG_QUALITY: u8 = 85;

pub(crate) fn image_format(format: Format) -> Option<ImageFormat> {
    match format {
        Format::Jpg | Format::Jpeg => Some(ImageFormat::Jpeg),
        Format::Png => Some(ImageFormat::Png),
        Format::Webp => Some(ImageFormat::WebP),
        Format::Tiff => Some(ImageFormat::Tiff),
        _ => None,
    }
}

pub(crate) fn decode(bytes: &[u8]) -> Result<DynamicImage, ConvertError> {
    image::load_from_memory(bytes)
        .map_err(|e| ConvertError::Malformed(format!("could not decode image: {e}")))
}

pub(crate) fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, ConvertError> {
    // JPEG has no alpha channel.
    let rgb = img.to_rgb8();
    let mut out = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))
        .map_err(|e| ConvertError::Backend(format!("jpeg encode: {e}")))?;
    Ok(out)
}

fn encode(img: &DynamicImage, target: Format) -> Result<Vec<u8>, ConvertError> {
    if target.is_jpeg() {
        return encode_jpeg(img, JPEG_QUALITY);
    }

    let format = image_format(target)
        .ok_or_else(|| ConvertError::Backend(format!("{target} is not a raster format")))?;
    // The WebP encoder in `image` is lossless and only takes 8-bit RGB(A).
    let img = if target == Format::Webp {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        img.clone()
    };

    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format)
        .map_err(|e| ConvertError::Backend(format!("{target} encode: {e}")))?;
    Ok(out.into_inner())
}

/// Re-encode a raster image, or place it on a PDF page.
pub fn convert(bytes: &[u8], target: Format) -> Result<Vec<u8>, ConvertError> {
    let img = decode(bytes)?;
    if target == Format::Pdf {
        let jpeg = encode_jpeg(&img, JPEG_QUALITY)?;
        return pdf::jpeg_to_pdf(jpeg, img.width(), img.height());
    }
    encode(&img, target)
}
