//! Transformations that change how the result is encoded, not its pixels.

use super::super::backend::{Canvas, Dimensions};
use super::super::params::{ParamReader, Quality};
use super::super::registry::Transformation;
use super::super::spec::Params;
use crate::error::{Error, Result};
use image::ImageFormat;

/// Set the lossy encoding quality.
pub struct Compress;

impl Compress {
    fn quality(params: &Params) -> Result<Quality> {
        let r = ParamReader::new("compress", params);
        let raw = r.require_str("level")?;
        match raw.trim().parse::<u32>() {
            Ok(level @ 1..=100) => Ok(Quality::new(level)),
            _ => Err(Error::invalid(format!(
                "compress: parameter 'level' must be between 1 and 100, got '{raw}'"
            ))),
        }
    }
}

impl Transformation for Compress {
    fn name(&self) -> &'static str {
        "compress"
    }

    fn plan(&self, input: Dimensions, params: &Params) -> Result<Dimensions> {
        Self::quality(params)?;
        Ok(input)
    }

    fn apply(&self, mut canvas: Canvas, params: &Params) -> Result<Canvas> {
        canvas.quality = Self::quality(params)?;
        Ok(canvas)
    }
}

/// Change the output format.
pub struct Convert;

const CONVERT_TYPES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("gif", ImageFormat::Gif),
    ("webp", ImageFormat::WebP),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
];

impl Convert {
    fn format(params: &Params) -> Result<ImageFormat> {
        let r = ParamReader::new("convert", params);
        let raw = r.require_str("type")?;
        let wanted = raw.to_ascii_lowercase();
        CONVERT_TYPES
            .iter()
            .find(|(ext, _)| *ext == wanted)
            .map(|(_, format)| *format)
            .ok_or_else(|| Error::invalid(format!("convert: unsupported type '{raw}'")))
    }
}

impl Transformation for Convert {
    fn name(&self) -> &'static str {
        "convert"
    }

    fn plan(&self, input: Dimensions, params: &Params) -> Result<Dimensions> {
        Self::format(params)?;
        Ok(input)
    }

    fn apply(&self, mut canvas: Canvas, params: &Params) -> Result<Canvas> {
        canvas.format = Self::format(params)?;
        Ok(canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{apply_checked, coord_canvas, dims, params};
    use super::*;

    #[test]
    fn compress_sets_quality() {
        let out = apply_checked(&Compress, coord_canvas(2, 2), "compress:level=40");
        assert_eq!(out.quality.value(), 40);
    }

    #[test]
    fn compress_level_range_checked() {
        for raw in ["compress:level=0", "compress:level=101", "compress:level=high", "compress"] {
            let err = Compress.plan(dims(2, 2), &params(raw)).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)), "{raw}");
        }
    }

    #[test]
    fn convert_sets_format() {
        let out = apply_checked(&Convert, coord_canvas(2, 2), "convert:type=JPG");
        assert_eq!(out.format, ImageFormat::Jpeg);
        assert_eq!(out.mime(), "image/jpeg");
    }

    #[test]
    fn convert_rejects_unknown_type() {
        let err = Convert.plan(dims(2, 2), &params("convert:type=bmp")).unwrap_err();
        assert!(err.to_string().contains("unsupported type 'bmp'"));
    }
}
