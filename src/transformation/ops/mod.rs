//! Built-in transformations.
//!
//! | Name | Parameters | Output size |
//! |---|---|---|
//! | `border` | `color` (000000), `width` (1), `height` (1), `mode` (outbound \| inline) | grows by 2×border when outbound |
//! | `canvas` | `width`, `height`, `mode` (free \| center \| center-x \| center-y), `x`, `y`, `bg` (ffffff) | `width`×`height` |
//! | `compress` | `level` (1–100, required) | unchanged |
//! | `convert` | `type` (jpg, png, gif, webp, tif; required) | unchanged |
//! | `crop` | `x` (0), `y` (0), `width`, `height` (required) | clipped to the image |
//! | `desaturate` | none | unchanged |
//! | `flipHorizontally`, `flipVertically` | none | unchanged |
//! | `maxSize` | `width` and/or `height` | fits inside, never upscales |
//! | `resize` | `width` and/or `height` | missing side keeps aspect ratio |
//! | `rotate` | `angle` (multiple of 90, required), `bg` | sides swap on 90/270 |
//! | `thumbnail` | `width` (50), `height` (50), `fit` (outbound \| inset) | exact, or fit inside |
//! | `transpose`, `transverse` | none | sides swap |

mod color;
mod encoding;
mod geometry;
mod orientation;

use super::registry::Transformation;
use image::imageops::FilterType;
use std::sync::Arc;

/// Resampling filter for every size change.
pub(crate) const FILTER: FilterType = FilterType::Lanczos3;

pub(crate) fn builtins() -> Vec<Arc<dyn Transformation>> {
    vec![
        Arc::new(geometry::Border),
        Arc::new(geometry::ExtendCanvas),
        Arc::new(encoding::Compress),
        Arc::new(encoding::Convert),
        Arc::new(geometry::Crop),
        Arc::new(color::Desaturate),
        Arc::new(orientation::FlipHorizontally),
        Arc::new(orientation::FlipVertically),
        Arc::new(geometry::MaxSize),
        Arc::new(geometry::Resize),
        Arc::new(orientation::Rotate),
        Arc::new(geometry::Thumbnail),
        Arc::new(orientation::Transpose),
        Arc::new(orientation::Transverse),
    ]
}
