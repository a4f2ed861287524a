//! Flips, right-angle rotations and diagonal mirrors. Lossless: no
//! resampling, pixels only move.

use super::super::backend::{Canvas, Dimensions};
use super::super::params::ParamReader;
use super::super::registry::Transformation;
use super::super::spec::Params;
use crate::error::{Error, Result};

fn swapped(d: Dimensions) -> Dimensions {
    Dimensions {
        width: d.height,
        height: d.width,
    }
}

pub struct FlipHorizontally;

impl Transformation for FlipHorizontally {
    fn name(&self) -> &'static str {
        "flipHorizontally"
    }

    fn plan(&self, input: Dimensions, _params: &Params) -> Result<Dimensions> {
        Ok(input)
    }

    fn apply(&self, canvas: Canvas, _params: &Params) -> Result<Canvas> {
        let image = canvas.image.fliph();
        Ok(Canvas { image, ..canvas })
    }
}

pub struct FlipVertically;

impl Transformation for FlipVertically {
    fn name(&self) -> &'static str {
        "flipVertically"
    }

    fn plan(&self, input: Dimensions, _params: &Params) -> Result<Dimensions> {
        Ok(input)
    }

    fn apply(&self, canvas: Canvas, _params: &Params) -> Result<Canvas> {
        let image = canvas.image.flipv();
        Ok(Canvas { image, ..canvas })
    }
}

/// Clockwise rotation by a multiple of 90 degrees.
pub struct Rotate;

impl Rotate {
    /// Angle normalized to 0, 90, 180 or 270.
    fn angle(params: &Params) -> Result<u32> {
        let r = ParamReader::new("rotate", params);
        let raw = r.require_str("angle")?;
        // `bg` is accepted for compatibility; right angles never expose it
        r.opt_color("bg")?;

        let degrees: f64 = raw
            .trim()
            .parse()
            .map_err(|_| Error::invalid(format!("rotate: parameter 'angle' must be a number, got '{raw}'")))?;
        if degrees.fract() != 0.0 || (degrees as i64) % 90 != 0 {
            return Err(Error::invalid(format!(
                "rotate: only multiples of 90 degrees are supported, got {raw}"
            )));
        }
        Ok((degrees as i64).rem_euclid(360) as u32)
    }
}

impl Transformation for Rotate {
    fn name(&self) -> &'static str {
        "rotate"
    }

    fn plan(&self, input: Dimensions, params: &Params) -> Result<Dimensions> {
        Ok(match Self::angle(params)? {
            90 | 270 => swapped(input),
            _ => input,
        })
    }

    fn apply(&self, canvas: Canvas, params: &Params) -> Result<Canvas> {
        let image = match Self::angle(params)? {
            90 => canvas.image.rotate90(),
            180 => canvas.image.rotate180(),
            270 => canvas.image.rotate270(),
            _ => return Ok(canvas),
        };
        Ok(Canvas { image, ..canvas })
    }
}

/// Mirror across the top-left to bottom-right diagonal.
pub struct Transpose;

impl Transformation for Transpose {
    fn name(&self) -> &'static str {
        "transpose"
    }

    fn plan(&self, input: Dimensions, _params: &Params) -> Result<Dimensions> {
        Ok(swapped(input))
    }

    fn apply(&self, canvas: Canvas, _params: &Params) -> Result<Canvas> {
        let image = canvas.image.rotate90().fliph();
        Ok(Canvas { image, ..canvas })
    }
}

/// Mirror across the top-right to bottom-left diagonal.
pub struct Transverse;

impl Transformation for Transverse {
    fn name(&self) -> &'static str {
        "transverse"
    }

    fn plan(&self, input: Dimensions, _params: &Params) -> Result<Dimensions> {
        Ok(swapped(input))
    }

    fn apply(&self, canvas: Canvas, _params: &Params) -> Result<Canvas> {
        let image = canvas.image.rotate90().flipv();
        Ok(Canvas { image, ..canvas })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{apply_checked, coord_canvas, dims, params, pixel};
    use super::*;

    #[test]
    fn flip_horizontally_mirrors_x() {
        let out = apply_checked(&FlipHorizontally, coord_canvas(4, 2), "flipHorizontally");
        assert_eq!(pixel(&out, 0, 0), [3, 0, 0, 255]);
        assert_eq!(pixel(&out, 3, 1), [0, 1, 0, 255]);
    }

    #[test]
    fn flip_vertically_mirrors_y() {
        let out = apply_checked(&FlipVertically, coord_canvas(4, 2), "flipVertically");
        assert_eq!(pixel(&out, 0, 0), [0, 1, 0, 255]);
    }

    #[test]
    fn rotate_90_swaps_sides() {
        let out = apply_checked(&Rotate, coord_canvas(4, 2), "rotate:angle=90");
        assert_eq!(out.dimensions(), dims(2, 4));
        // Clockwise: bottom-left corner moves to top-left
        assert_eq!(pixel(&out, 0, 0), [0, 1, 0, 255]);
    }

    #[test]
    fn rotate_normalizes_angles() {
        let p = |a: &str| params(&format!("rotate:angle={a}"));
        assert_eq!(Rotate.plan(dims(4, 2), &p("-90")).unwrap(), dims(2, 4));
        assert_eq!(Rotate.plan(dims(4, 2), &p("360")).unwrap(), dims(4, 2));
        assert_eq!(Rotate.plan(dims(4, 2), &p("180")).unwrap(), dims(4, 2));
        let out = apply_checked(&Rotate, coord_canvas(4, 2), "rotate:angle=-270");
        assert_eq!(pixel(&out, 0, 0), [0, 1, 0, 255]);
    }

    #[test]
    fn rotate_rejects_odd_angles() {
        let err = Rotate.plan(dims(4, 2), &params("rotate:angle=45")).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(err.status_code(), 400);
        let err = Rotate.plan(dims(4, 2), &params("rotate:angle=abc")).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        let err = Rotate.plan(dims(4, 2), &params("rotate:bg=fff")).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn transpose_swaps_coordinates() {
        let out = apply_checked(&Transpose, coord_canvas(3, 2), "transpose");
        assert_eq!(out.dimensions(), dims(2, 3));
        // (x, y) → (y, x)
        assert_eq!(pixel(&out, 0, 2), [2, 0, 0, 255]);
        assert_eq!(pixel(&out, 1, 0), [0, 1, 0, 255]);
    }

    #[test]
    fn transverse_mirrors_other_diagonal() {
        let out = apply_checked(&Transverse, coord_canvas(3, 2), "transverse");
        assert_eq!(out.dimensions(), dims(2, 3));
        // (x, y) → (h-1-y, w-1-x)
        assert_eq!(pixel(&out, 1, 2), [0, 0, 0, 255]);
        assert_eq!(pixel(&out, 0, 0), [2, 1, 0, 255]);
    }
}
