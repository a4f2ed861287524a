//! Shared test utilities for the pixstore test suite.
//!
//! Provides synthetic image fixtures (encoded with the `image` crate so the
//! real backend can decode them) and canned `ImageInfo` records.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let original = png_bytes(64, 48);
//! let store = MemoryStore::new();
//! store.store_original(ACCOUNT, ID, &original).unwrap();
//! store.store_info(&sample_info(ID)).unwrap();
//! ```

use chrono::{TimeZone, Utc};
use image::{ImageFormat, RgbImage};
use std::collections::BTreeMap;
use std::io::Cursor;

use crate::identifier::checksum;
use crate::storage::ImageInfo;

/// Account used throughout the tests. Shards as `c/h/r/christer`.
pub const ACCOUNT: &str = "christer";

// =========================================================================
// Image fixtures
// =========================================================================

/// A `width`×`height` RGB gradient, so resampling produces real pixel
/// differences rather than a flat color.
fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x + y) % 256) as u8,
        ])
    })
}

fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    gradient(width, height).write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

/// PNG-encoded gradient.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Png)
}

/// JPEG-encoded gradient.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Jpeg)
}

// =========================================================================
// Records
// =========================================================================

/// An 800×600 PNG owned by [`ACCOUNT`], with fixed timestamps.
pub fn sample_info(identifier: &str) -> ImageInfo {
    let created = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    ImageInfo {
        account: ACCOUNT.to_string(),
        identifier: identifier.to_string(),
        width: 800,
        height: 600,
        mime: "image/png".to_string(),
        checksum: checksum(identifier.as_bytes()),
        size: 1024,
        created,
        updated: created,
        metadata: BTreeMap::new(),
    }
}
