//! Pure Rust codec backend over the `image` crate.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `ImageReader::with_guessed_format` + `into_dimensions` (header only) |
//! | Decode (JPEG, PNG, TIFF, WebP, GIF) | `ImageReader::decode` |
//! | Encode JPEG | `codecs::jpeg::JpegEncoder` with the canvas quality |
//! | Encode PNG, TIFF, WebP (lossless), GIF | `DynamicImage::write_to` |

use super::backend::{BackendError, Canvas, Dimensions, Identified, ImageBackend};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;

/// Formats with compiled-in decoders and encoders.
const SUPPORTED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Tiff,
    ImageFormat::WebP,
    ImageFormat::Gif,
];

/// Whether the backend can read and write `format`.
pub fn is_supported(format: ImageFormat) -> bool {
    SUPPORTED_FORMATS.contains(&format)
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn reader(bytes: &[u8]) -> Result<(ImageReader<Cursor<&[u8]>>, ImageFormat), BackendError> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    let format = reader
        .format()
        .ok_or_else(|| BackendError::UnsupportedFormat("unrecognized image data".into()))?;
    if !is_supported(format) {
        return Err(BackendError::UnsupportedFormat(format!("{format:?}")));
    }
    Ok((reader, format))
}

fn encode_jpeg(canvas: &Canvas) -> Result<Vec<u8>, BackendError> {
    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(canvas.image.to_rgb8());
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, canvas.quality.value());
    rgb.write_with_encoder(encoder)
        .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {e}")))?;
    Ok(out)
}

fn encode_generic(canvas: &Canvas) -> Result<Vec<u8>, BackendError> {
    let image = match canvas.format {
        // The WebP and GIF encoders take 8-bit RGB(A) only
        ImageFormat::WebP | ImageFormat::Gif => DynamicImage::ImageRgba8(canvas.image.to_rgba8()),
        _ => canvas.image.clone(),
    };
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, canvas.format).map_err(|e| {
        BackendError::ProcessingFailed(format!("{:?} encode failed: {e}", canvas.format))
    })?;
    Ok(out.into_inner())
}

impl ImageBackend for RustBackend {
    fn identify(&self, bytes: &[u8]) -> Result<Identified, BackendError> {
        let (reader, format) = reader(bytes)?;
        let (width, height) = reader.into_dimensions().map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to read dimensions: {e}"))
        })?;
        Ok(Identified {
            dimensions: Dimensions { width, height },
            format,
        })
    }

    fn decode(&self, bytes: &[u8]) -> Result<Canvas, BackendError> {
        let (reader, format) = reader(bytes)?;
        let image = reader
            .decode()
            .map_err(|e| BackendError::ProcessingFailed(format!("Failed to decode: {e}")))?;
        Ok(Canvas::new(image, format))
    }

    fn encode(&self, canvas: &Canvas) -> Result<Vec<u8>, BackendError> {
        match canvas.format {
            ImageFormat::Jpeg => encode_jpeg(canvas),
            f if is_supported(f) => encode_generic(canvas),
            other => Err(BackendError::UnsupportedFormat(format!("{other:?}"))),
        }
    }
}
