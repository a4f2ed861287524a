//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.
//! Transformations use them both to plan output sizes and to render, so the
//! planned size of a pipeline always equals what rendering produces.

use super::backend::Dimensions;

fn scaled(value: u32, num: u32, den: u32) -> u32 {
    ((value as f64 * num as f64 / den as f64).round() as u32).max(1)
}

/// Dimensions for a resize where either side may be omitted.
///
/// A missing side follows the source aspect ratio; both missing keeps the
/// source size.
///
/// ```
/// # use pixstore::transformation::calculations::resize_dimensions;
/// # use pixstore::transformation::Dimensions;
/// let src = Dimensions { width: 800, height: 600 };
/// assert_eq!(resize_dimensions(src, Some(400), None), Dimensions { width: 400, height: 300 });
/// ```
pub fn resize_dimensions(source: Dimensions, width: Option<u32>, height: Option<u32>) -> Dimensions {
    match (width, height) {
        (Some(w), Some(h)) => Dimensions {
            width: w,
            height: h,
        },
        (Some(w), None) => Dimensions {
            width: w,
            height: scaled(source.height, w, source.width),
        },
        (None, Some(h)) => Dimensions {
            width: scaled(source.width, h, source.height),
            height: h,
        },
        (None, None) => source,
    }
}

/// Scale to the largest size with the source aspect ratio that fits inside
/// `bounds`, up or down.
pub fn scale_to_fit(source: Dimensions, bounds: Dimensions) -> Dimensions {
    let src_aspect = source.width as f64 / source.height as f64;
    let box_aspect = bounds.width as f64 / bounds.height as f64;
    if src_aspect > box_aspect {
        // Width is the binding constraint
        Dimensions {
            width: bounds.width,
            height: scaled(source.height, bounds.width, source.width).min(bounds.height),
        }
    } else {
        Dimensions {
            width: scaled(source.width, bounds.height, source.height).min(bounds.width),
            height: bounds.height,
        }
    }
}

/// Like [`scale_to_fit`] with optional bounds, but never upscales.
pub fn fit_within(source: Dimensions, max_width: Option<u32>, max_height: Option<u32>) -> Dimensions {
    let bounds = Dimensions {
        width: max_width.unwrap_or(source.width),
        height: max_height.unwrap_or(source.height),
    };
    if source.width <= bounds.width && source.height <= bounds.height {
        return source;
    }
    scale_to_fit(source, bounds)
}

/// Calculate dimensions needed to fill a target area (resize before crop).
///
/// Returns dimensions that completely cover the target area while maintaining
/// the source aspect ratio. One dimension will match exactly, the other may exceed.
pub fn fill_dimensions(source: Dimensions, target: Dimensions) -> Dimensions {
    let src_aspect = source.width as f64 / source.height as f64;
    let tgt_aspect = target.width as f64 / target.height as f64;

    if src_aspect > tgt_aspect {
        // Source is wider: height will match, width will exceed
        Dimensions {
            width: scaled(source.width, target.height, source.height).max(target.width),
            height: target.height,
        }
    } else {
        // Source is taller: width will match, height will exceed
        Dimensions {
            width: target.width,
            height: scaled(source.height, target.width, source.width).max(target.height),
        }
    }
}

/// Offset that centers `inner` inside `outer` along one axis. Negative when
/// `inner` is larger and will be clipped on both sides.
pub fn center_offset(outer: u32, inner: u32) -> i64 {
    (outer as i64 - inner as i64) / 2
}

/// Clip a crop region to the image. `None` when the origin lies outside.
pub fn clip_region(
    source: Dimensions,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
) -> Option<Dimensions> {
    if x >= source.width || y >= source.height {
        return None;
    }
    Some(Dimensions {
        width: width.min(source.width - x),
        height: height.min(source.height - y),
    })
}
