//! Running a parsed pipeline against an original.
//!
//! Rendering is strictly sequential: decode once, apply each step in
//! request order, encode once. Planning walks the same steps over
//! dimensions only.

use super::backend::{Dimensions, ImageBackend};
use super::params::Quality;
use super::registry::TransformationRegistry;
use super::spec::TransformationDescriptor;
use crate::error::{Error, Result};
use std::sync::Arc;

/// An encoded result ready to hand to a response formatter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub blob: Vec<u8>,
    pub mime: String,
    pub width: u32,
    pub height: u32,
}

/// Largest width or height a step may produce unless configured otherwise.
pub const DEFAULT_MAX_DIMENSION: u32 = 16384;

/// Registry + codec backend, shared by every request.
#[derive(Clone)]
pub struct Renderer {
    registry: Arc<TransformationRegistry>,
    backend: Arc<dyn ImageBackend>,
    default_quality: Quality,
    max_dimension: u32,
}

impl Renderer {
    pub fn new(
        registry: Arc<TransformationRegistry>,
        backend: Arc<dyn ImageBackend>,
        default_quality: Quality,
    ) -> Self {
        Self {
            registry,
            backend,
            default_quality,
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }

    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    pub fn backend(&self) -> &dyn ImageBackend {
        self.backend.as_ref()
    }

    pub fn registry(&self) -> &TransformationRegistry {
        &self.registry
    }

    /// Encode quality when no `compress` step is present.
    pub fn default_quality(&self) -> Quality {
        self.default_quality
    }

    /// Final output dimensions, without touching pixels.
    ///
    /// Also validates every step: unknown names, bad parameters and sizes
    /// past the maximum dimension fail here, before any original is loaded.
    pub fn plan(&self, input: Dimensions, pipeline: &[TransformationDescriptor]) -> Result<Dimensions> {
        pipeline.iter().try_fold(input, |dims, step| {
            let out = self.registry.get(&step.name)?.plan(dims, &step.params)?;
            if out.width > self.max_dimension || out.height > self.max_dimension {
                return Err(Error::invalid(format!(
                    "{}: output {out} exceeds the {} pixel limit",
                    step.name, self.max_dimension
                )));
            }
            Ok(out)
        })
    }

    /// Decode `original`, apply every step in order, encode.
    pub fn render(&self, original: &[u8], pipeline: &[TransformationDescriptor]) -> Result<Rendered> {
        let steps = pipeline
            .iter()
            .map(|step| Ok((self.registry.get(&step.name)?, &step.params)))
            .collect::<Result<Vec<_>>>()?;

        let mut canvas = self
            .backend
            .decode(original)
            .map_err(|e| Error::Transformation(format!("decode failed: {e}")))?;
        canvas.quality = self.default_quality;
        // Stored dimensions may be stale; check against the decoded ones
        self.plan(canvas.dimensions(), pipeline)?;

        for (transformation, params) in steps {
            canvas = transformation.apply(canvas, params)?;
        }

        let dims = canvas.dimensions();
        let blob = self
            .backend
            .encode(&canvas)
            .map_err(|e| Error::Transformation(format!("encode failed: {e}")))?;
        Ok(Rendered {
            blob,
            mime: canvas.mime().to_string(),
            width: dims.width,
            height: dims.height,
        })
    }
}
