//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations every backend must
//! support: identify, decode, and encode. Pixel work between decode and
//! encode happens on [`Canvas`] values inside the transformations.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust over the
//! `image` crate.

use super::params::Quality;
use image::{DynamicImage, ImageFormat};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identified {
    pub dimensions: Dimensions,
    pub format: ImageFormat,
}

impl Identified {
    pub fn mime(&self) -> &'static str {
        self.format.to_mime_type()
    }
}

/// Decoded pixels plus the encoding they will be written with.
///
/// Transformations mutate the pixels (`image`) or the encoding (`format`,
/// `quality`); the backend encodes whatever is left at the end.
#[derive(Debug, Clone)]
pub struct Canvas {
    pub image: DynamicImage,
    pub format: ImageFormat,
    pub quality: Quality,
}

impl Canvas {
    pub fn new(image: DynamicImage, format: ImageFormat) -> Self {
        Self {
            image,
            format,
            quality: Quality::default(),
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.image.width(),
            height: self.image.height(),
        }
    }

    pub fn mime(&self) -> &'static str {
        self.format.to_mime_type()
    }
}

/// Trait for image codec backends.
///
/// Implementations must be deterministic: the same bytes in, the same
/// result out, so cached variations are interchangeable with fresh ones.
pub trait ImageBackend: Send + Sync {
    /// Read format and dimensions without a full decode where possible.
    fn identify(&self, bytes: &[u8]) -> Result<Identified, BackendError>;

    /// Decode an original into a canvas that keeps its source format.
    fn decode(&self, bytes: &[u8]) -> Result<Canvas, BackendError>;

    /// Encode a canvas with its current format and quality.
    fn encode(&self, canvas: &Canvas) -> Result<Vec<u8>, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock backend that records operations and fakes pixel data.
    ///
    /// Decoding yields a blank RGBA image of the configured size; encoding
    /// yields `"<format>:<w>x<h>:q<quality>"` so tests can read results
    /// back without a real codec. Uses Mutex (not RefCell) so it is Sync and
    /// works with rayon's par_iter.
    pub struct MockBackend {
        pub dimensions: Dimensions,
        pub format: ImageFormat,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify(usize),
        Decode(usize),
        Encode {
            format: ImageFormat,
            width: u32,
            height: u32,
            quality: u8,
        },
    }

    impl MockBackend {
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                dimensions: Dimensions { width, height },
                format: ImageFormat::Png,
                operations: Mutex::new(Vec::new()),
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        pub fn decode_count(&self) -> usize {
            self.get_operations()
                .iter()
                .filter(|op| matches!(op, RecordedOp::Decode(_)))
                .count()
        }
    }

    impl ImageBackend for MockBackend {
        fn identify(&self, bytes: &[u8]) -> Result<Identified, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Identify(bytes.len()));
            if bytes.is_empty() {
                return Err(BackendError::UnsupportedFormat("empty input".into()));
            }
            Ok(Identified {
                dimensions: self.dimensions,
                format: self.format,
            })
        }

        fn decode(&self, bytes: &[u8]) -> Result<Canvas, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Decode(bytes.len()));
            let image = DynamicImage::new_rgba8(self.dimensions.width, self.dimensions.height);
            Ok(Canvas::new(image, self.format))
        }

        fn encode(&self, canvas: &Canvas) -> Result<Vec<u8>, BackendError> {
            let dims = canvas.dimensions();
            self.operations.lock().unwrap().push(RecordedOp::Encode {
                format: canvas.format,
                width: dims.width,
                height: dims.height,
                quality: canvas.quality.value(),
            });
            Ok(format!(
                "{:?}:{}:q{}",
                canvas.format,
                dims,
                canvas.quality.value()
            )
            .into_bytes())
        }
    }

    #[test]
    fn mock_records_identify() {
        let backend = MockBackend::new(800, 600);

        let result = backend.identify(b"not really an image").unwrap();
        assert_eq!(result.dimensions.width, 800);
        assert_eq!(result.dimensions.height, 600);
        assert_eq!(result.mime(), "image/png");

        let ops = backend.get_operations();
        assert_eq!(ops, vec![RecordedOp::Identify(19)]);
    }

    #[test]
    fn mock_encodes_readable_summary() {
        let backend = MockBackend::new(4, 3);
        let mut canvas = backend.decode(b"x").unwrap();
        canvas.quality = Quality::new(70);
        let out = backend.encode(&canvas).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Png:4x3:q70");
        assert_eq!(backend.decode_count(), 1);
    }

    #[test]
    fn dimensions_display() {
        assert_eq!(
            Dimensions {
                width: 640,
                height: 480
            }
            .to_string(),
            "640x480"
        );
    }
}
