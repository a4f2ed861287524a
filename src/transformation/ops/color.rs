use super::super::backend::{Canvas, Dimensions};
use super::super::registry::Transformation;
use super::super::spec::Params;
use crate::error::Result;

/// Convert to grayscale, keeping alpha.
pub struct Desaturate;

impl Transformation for Desaturate {
    fn name(&self) -> &'static str {
        "desaturate"
    }

    fn plan(&self, input: Dimensions, _params: &Params) -> Result<Dimensions> {
        Ok(input)
    }

    fn apply(&self, canvas: Canvas, _params: &Params) -> Result<Canvas> {
        let image = canvas.image.grayscale();
        Ok(Canvas { image, ..canvas })
    }
}
