//! Size-changing transformations.

use super::super::backend::{Canvas, Dimensions};
use super::super::calculations::{
    center_offset, clip_region, fit_within, resize_dimensions, scale_to_fit,
};
use super::super::params::{Color, ParamReader};
use super::super::registry::Transformation;
use super::super::spec::Params;
use super::FILTER;
use crate::error::{Error, Result};
use image::{DynamicImage, RgbaImage, imageops};

fn resized(canvas: Canvas, target: Dimensions) -> Canvas {
    if canvas.dimensions() == target {
        return canvas;
    }
    let image = canvas.image.resize_exact(target.width, target.height, FILTER);
    Canvas { image, ..canvas }
}

/// `width` and/or `height`, at least one given, both non-zero.
fn size_bounds(r: &ParamReader<'_>, name: &str) -> Result<(Option<u32>, Option<u32>)> {
    let width = r.opt_positive("width")?;
    let height = r.opt_positive("height")?;
    if width.is_none() && height.is_none() {
        return Err(Error::invalid(format!(
            "{name}: parameter 'width' or 'height' is required"
        )));
    }
    Ok((width, height))
}

// =========================================================================
// border
// =========================================================================

pub struct Border;

struct BorderSpec {
    color: Color,
    width: u32,
    height: u32,
    inline: bool,
}

impl Border {
    fn read(params: &Params) -> Result<BorderSpec> {
        let r = ParamReader::new("border", params);
        Ok(BorderSpec {
            color: r.color_or("color", Color::BLACK)?,
            width: r.u32_or("width", 1)?,
            height: r.u32_or("height", 1)?,
            inline: r.choice("mode", &["outbound", "inline"], "outbound")? == "inline",
        })
    }

    /// Size of the image with an outbound border on every side.
    fn grown(input: Dimensions, spec: &BorderSpec) -> Result<Dimensions> {
        let grow = |side: u32, border: u32| {
            border
                .checked_mul(2)
                .and_then(|b| side.checked_add(b))
                .ok_or_else(|| Error::invalid(format!("border: {border} pixel border is too large")))
        };
        Ok(Dimensions {
            width: grow(input.width, spec.width)?,
            height: grow(input.height, spec.height)?,
        })
    }
}

impl Transformation for Border {
    fn name(&self) -> &'static str {
        "border"
    }

    fn plan(&self, input: Dimensions, params: &Params) -> Result<Dimensions> {
        let spec = Self::read(params)?;
        if spec.inline {
            return Ok(input);
        }
        Self::grown(input, &spec)
    }

    fn apply(&self, canvas: Canvas, params: &Params) -> Result<Canvas> {
        let spec = Self::read(params)?;
        let src = canvas.image.to_rgba8();

        let out = if spec.inline {
            let (w, h) = src.dimensions();
            let mut out = src;
            for (x, y, px) in out.enumerate_pixels_mut() {
                let in_border = x < spec.width
                    || y < spec.height
                    || x >= w.saturating_sub(spec.width)
                    || y >= h.saturating_sub(spec.height);
                if in_border {
                    *px = spec.color.0;
                }
            }
            out
        } else {
            let size = Self::grown(canvas.dimensions(), &spec)?;
            let mut out = RgbaImage::from_pixel(size.width, size.height, spec.color.0);
            imageops::replace(&mut out, &src, spec.width as i64, spec.height as i64);
            out
        };

        Ok(Canvas {
            image: DynamicImage::ImageRgba8(out),
            ..canvas
        })
    }
}

// =========================================================================
// canvas
// =========================================================================

/// Place the image on a new background of a given size.
pub struct ExtendCanvas;

struct CanvasSpec {
    width: Option<u32>,
    height: Option<u32>,
    mode: &'static str,
    x: i64,
    y: i64,
    bg: Color,
}

impl ExtendCanvas {
    fn read(params: &Params) -> Result<CanvasSpec> {
        let r = ParamReader::new("canvas", params);
        Ok(CanvasSpec {
            width: r.opt_positive("width")?,
            height: r.opt_positive("height")?,
            mode: r.choice("mode", &["free", "center", "center-x", "center-y"], "free")?,
            x: r.u32_or("x", 0)? as i64,
            y: r.u32_or("y", 0)? as i64,
            bg: r.color_or("bg", Color::WHITE)?,
        })
    }

    fn target(input: Dimensions, spec: &CanvasSpec) -> Dimensions {
        Dimensions {
            width: spec.width.unwrap_or(input.width),
            height: spec.height.unwrap_or(input.height),
        }
    }
}

impl Transformation for ExtendCanvas {
    fn name(&self) -> &'static str {
        "canvas"
    }

    fn plan(&self, input: Dimensions, params: &Params) -> Result<Dimensions> {
        Ok(Self::target(input, &Self::read(params)?))
    }

    fn apply(&self, canvas: Canvas, params: &Params) -> Result<Canvas> {
        let spec = Self::read(params)?;
        let input = canvas.dimensions();
        let target = Self::target(input, &spec);

        let cx = center_offset(target.width, input.width);
        let cy = center_offset(target.height, input.height);
        let (x, y) = match spec.mode {
            "center" => (cx, cy),
            "center-x" => (cx, spec.y),
            "center-y" => (spec.x, cy),
            _ => (spec.x, spec.y),
        };

        let mut out = RgbaImage::from_pixel(target.width, target.height, spec.bg.0);
        imageops::replace(&mut out, &canvas.image.to_rgba8(), x, y);
        Ok(Canvas {
            image: DynamicImage::ImageRgba8(out),
            ..canvas
        })
    }
}

// =========================================================================
// crop
// =========================================================================

pub struct Crop;

impl Crop {
    fn region(input: Dimensions, params: &Params) -> Result<(u32, u32, Dimensions)> {
        let r = ParamReader::new("crop", params);
        let x = r.u32_or("x", 0)?;
        let y = r.u32_or("y", 0)?;
        let width = r.require_u32("width")?;
        let height = r.require_u32("height")?;
        if width == 0 || height == 0 {
            return Err(Error::invalid("crop: width and height must be greater than zero"));
        }
        let size = clip_region(input, x, y, width, height).ok_or_else(|| {
            Error::Transformation(format!("crop origin ({x}, {y}) lies outside {input} image"))
        })?;
        Ok((x, y, size))
    }
}

impl Transformation for Crop {
    fn name(&self) -> &'static str {
        "crop"
    }

    fn plan(&self, input: Dimensions, params: &Params) -> Result<Dimensions> {
        Ok(Self::region(input, params)?.2)
    }

    fn apply(&self, canvas: Canvas, params: &Params) -> Result<Canvas> {
        let (x, y, size) = Self::region(canvas.dimensions(), params)?;
        let image = canvas.image.crop_imm(x, y, size.width, size.height);
        Ok(Canvas { image, ..canvas })
    }
}

// =========================================================================
// maxSize / resize
// =========================================================================

pub struct MaxSize;

impl Transformation for MaxSize {
    fn name(&self) -> &'static str {
        "maxSize"
    }

    fn plan(&self, input: Dimensions, params: &Params) -> Result<Dimensions> {
        let (width, height) = size_bounds(&ParamReader::new("maxSize", params), "maxSize")?;
        Ok(fit_within(input, width, height))
    }

    fn apply(&self, canvas: Canvas, params: &Params) -> Result<Canvas> {
        let target = self.plan(canvas.dimensions(), params)?;
        Ok(resized(canvas, target))
    }
}

pub struct Resize;

impl Transformation for Resize {
    fn name(&self) -> &'static str {
        "resize"
    }

    fn plan(&self, input: Dimensions, params: &Params) -> Result<Dimensions> {
        let (width, height) = size_bounds(&ParamReader::new("resize", params), "resize")?;
        Ok(resize_dimensions(input, width, height))
    }

    fn apply(&self, canvas: Canvas, params: &Params) -> Result<Canvas> {
        let target = self.plan(canvas.dimensions(), params)?;
        Ok(resized(canvas, target))
    }
}

// =========================================================================
// thumbnail
// =========================================================================

pub struct Thumbnail;

impl Thumbnail {
    fn read(params: &Params) -> Result<(Dimensions, bool)> {
        let r = ParamReader::new("thumbnail", params);
        let size = Dimensions {
            width: r.opt_positive("width")?.unwrap_or(50),
            height: r.opt_positive("height")?.unwrap_or(50),
        };
        let inset = r.choice("fit", &["outbound", "inset"], "outbound")? == "inset";
        Ok((size, inset))
    }
}

impl Transformation for Thumbnail {
    fn name(&self) -> &'static str {
        "thumbnail"
    }

    fn plan(&self, input: Dimensions, params: &Params) -> Result<Dimensions> {
        let (size, inset) = Self::read(params)?;
        Ok(if inset { scale_to_fit(input, size) } else { size })
    }

    fn apply(&self, canvas: Canvas, params: &Params) -> Result<Canvas> {
        let (size, inset) = Self::read(params)?;
        if inset {
            let target = scale_to_fit(canvas.dimensions(), size);
            return Ok(resized(canvas, target));
        }
        let image = canvas.image.resize_to_fill(size.width, size.height, FILTER);
        Ok(Canvas { image, ..canvas })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{apply_checked, coord_canvas, dims, params, pixel};
    use super::*;

    // =========================================================================
    // border
    // =========================================================================

    #[test]
    fn border_outbound_grows_image() {
        let out = apply_checked(&Border, coord_canvas(10, 8), "border:color=f00,width=2,height=3");
        assert_eq!(out.dimensions(), dims(14, 14));
        assert_eq!(pixel(&out, 0, 0), [255, 0, 0, 255]);
        // Original pixel (0,0) moved to (2,3)
        assert_eq!(pixel(&out, 2, 3), [0, 0, 0, 255]);
        assert_eq!(pixel(&out, 3, 3), [1, 0, 0, 255]);
    }

    #[test]
    fn border_inline_keeps_size() {
        let out = apply_checked(&Border, coord_canvas(10, 10), "border:color=fff,mode=inline");
        assert_eq!(out.dimensions(), dims(10, 10));
        assert_eq!(pixel(&out, 0, 5), [255, 255, 255, 255]);
        assert_eq!(pixel(&out, 9, 5), [255, 255, 255, 255]);
        assert_eq!(pixel(&out, 5, 5), [5, 5, 0, 255]);
    }

    #[test]
    fn border_defaults_to_one_black_pixel() {
        let out = apply_checked(&Border, coord_canvas(4, 4), "border");
        assert_eq!(out.dimensions(), dims(6, 6));
        assert_eq!(pixel(&out, 0, 0), [0, 0, 0, 255]);
    }

    #[test]
    fn border_overflow_is_invalid_argument() {
        let err = Border.plan(dims(4, 4), &params("border:width=3000000000")).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        let err = Border
            .plan(dims(u32::MAX - 1, 4), &params("border:width=1"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        // Inline borders never grow the image
        let planned = Border
            .plan(dims(4, 4), &params("border:width=3000000000,mode=inline"))
            .unwrap();
        assert_eq!(planned, dims(4, 4));
    }

    #[test]
    fn border_rejects_bad_color() {
        let err = Border.plan(dims(4, 4), &params("border:color=nope")).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    // =========================================================================
    // canvas
    // =========================================================================

    #[test]
    fn canvas_free_places_at_offset() {
        let out = apply_checked(&ExtendCanvas, coord_canvas(4, 4), "canvas:width=10,height=10,x=2,y=3");
        assert_eq!(out.dimensions(), dims(10, 10));
        assert_eq!(pixel(&out, 0, 0), [255, 255, 255, 255]);
        assert_eq!(pixel(&out, 2, 3), [0, 0, 0, 255]);
        assert_eq!(pixel(&out, 3, 4), [1, 1, 0, 255]);
    }

    #[test]
    fn canvas_center_clips_larger_image() {
        let out = apply_checked(&ExtendCanvas, coord_canvas(10, 10), "canvas:width=4,height=4,mode=center");
        // Offset -3 on both axes: output (0,0) is input (3,3)
        assert_eq!(pixel(&out, 0, 0), [3, 3, 0, 255]);
    }

    #[test]
    fn canvas_without_size_keeps_dimensions() {
        let out = apply_checked(&ExtendCanvas, coord_canvas(6, 5), "canvas:bg=000");
        assert_eq!(out.dimensions(), dims(6, 5));
    }

    // =========================================================================
    // crop
    // =========================================================================

    #[test]
    fn crop_extracts_region() {
        let out = apply_checked(&Crop, coord_canvas(20, 20), "crop:x=5,y=6,width=4,height=3");
        assert_eq!(out.dimensions(), dims(4, 3));
        assert_eq!(pixel(&out, 0, 0), [5, 6, 0, 255]);
    }

    #[test]
    fn crop_clips_to_image() {
        let out = apply_checked(&Crop, coord_canvas(10, 10), "crop:x=8,y=0,width=5,height=20");
        assert_eq!(out.dimensions(), dims(2, 10));
    }

    #[test]
    fn crop_requires_size() {
        let err = Crop.plan(dims(10, 10), &params("crop:x=1")).unwrap_err();
        assert!(err.to_string().contains("'width' is required"));
    }

    #[test]
    fn crop_outside_image_fails() {
        let err = Crop
            .plan(dims(10, 10), &params("crop:x=10,y=0,width=1,height=1"))
            .unwrap_err();
        assert!(matches!(err, Error::Transformation(_)));
    }

    // =========================================================================
    // maxSize / resize
    // =========================================================================

    #[test]
    fn resize_width_only() {
        let out = apply_checked(&Resize, coord_canvas(40, 20), "resize:width=10");
        assert_eq!(out.dimensions(), dims(10, 5));
    }

    #[test]
    fn resize_requires_a_side() {
        let err = Resize.plan(dims(40, 20), &params("resize")).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        let err = Resize.plan(dims(40, 20), &params("resize:width=0")).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn max_size_never_upscales() {
        let out = apply_checked(&MaxSize, coord_canvas(40, 20), "maxSize:width=100,height=100");
        assert_eq!(out.dimensions(), dims(40, 20));
        let out = apply_checked(&MaxSize, coord_canvas(40, 20), "maxSize:width=20");
        assert_eq!(out.dimensions(), dims(20, 10));
    }

    // =========================================================================
    // thumbnail
    // =========================================================================

    #[test]
    fn thumbnail_outbound_is_exact() {
        let out = apply_checked(&Thumbnail, coord_canvas(80, 60), "thumbnail:width=20,height=25");
        assert_eq!(out.dimensions(), dims(20, 25));
    }

    #[test]
    fn thumbnail_defaults_to_50_square() {
        let out = apply_checked(&Thumbnail, coord_canvas(80, 60), "thumbnail");
        assert_eq!(out.dimensions(), dims(50, 50));
    }

    #[test]
    fn thumbnail_inset_fits_inside() {
        let out = apply_checked(&Thumbnail, coord_canvas(80, 40), "thumbnail:width=20,height=20,fit=inset");
        assert_eq!(out.dimensions(), dims(20, 10));
    }
}
