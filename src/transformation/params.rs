//! Typed access to transformation parameters.
//!
//! The parser keeps values as [`ParamValue`]s; these helpers turn them into
//! what a transformation needs and produce uniform `InvalidArgument` errors
//! naming the transformation and the key.
//!
//! ## Types
//!
//! - [`Quality`]: lossy encoding quality (1–100, default 90), clamped on construction.
//! - [`Color`]: RGBA parsed from hex (`fff`, `#ff0000`, `ff000080`) or a small set of names.

use super::spec::{ParamValue, Params};
use crate::error::{Error, Result};
use image::Rgba;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Prefix bare hex color strings with `#`; leave anything else alone.
///
/// `fff` → `#fff`, `FF00AA` → `#FF00AA`, `white` → `white`.
pub fn format_color(color: &str) -> String {
    let bare_hex = (3..=6).contains(&color.len()) && color.chars().all(|c| c.is_ascii_hexdigit());
    if bare_hex {
        format!("#{color}")
    } else {
        color.to_string()
    }
}

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub Rgba<u8>);

impl Color {
    pub const BLACK: Color = Color(Rgba([0, 0, 0, 255]));
    pub const WHITE: Color = Color(Rgba([255, 255, 255, 255]));
    pub const TRANSPARENT: Color = Color(Rgba([0, 0, 0, 0]));

    /// Parse a color as given in a transformation string.
    pub fn parse(raw: &str) -> Option<Color> {
        let formatted = format_color(raw);
        match formatted.strip_prefix('#') {
            Some(hex) => parse_hex(hex),
            None => named(&formatted.to_ascii_lowercase()),
        }
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let digit = |i: usize| u8::from_str_radix(&hex[i..=i], 16).ok();
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(Color(Rgba([
            digit(0)? * 17,
            digit(1)? * 17,
            digit(2)? * 17,
            255,
        ]))),
        6 => Some(Color(Rgba([byte(0)?, byte(2)?, byte(4)?, 255]))),
        8 => Some(Color(Rgba([byte(0)?, byte(2)?, byte(4)?, byte(6)?]))),
        _ => None,
    }
}

fn named(name: &str) -> Option<Color> {
    let rgb = match name {
        "black" => [0, 0, 0],
        "white" => [255, 255, 255],
        "red" => [255, 0, 0],
        "green" => [0, 128, 0],
        "blue" => [0, 0, 255],
        "yellow" => [255, 255, 0],
        "gray" | "grey" => [128, 128, 128],
        "transparent" => return Some(Color::TRANSPARENT),
        _ => return None,
    };
    Some(Color(Rgba([rgb[0], rgb[1], rgb[2], 255])))
}

/// Parameter reader bound to one transformation, for error messages.
pub struct ParamReader<'a> {
    transformation: &'a str,
    params: &'a Params,
}

impl<'a> ParamReader<'a> {
    pub fn new(transformation: &'a str, params: &'a Params) -> Self {
        Self {
            transformation,
            params,
        }
    }

    fn invalid(&self, key: &str, why: impl std::fmt::Display) -> Error {
        Error::invalid(format!(
            "{}: parameter '{key}' {why}",
            self.transformation
        ))
    }

    /// Optional non-negative integer. String values are accepted when they
    /// parse, so keys outside the numeric set still work.
    pub fn opt_u32(&self, key: &str) -> Result<Option<u32>> {
        let Some(value) = self.params.get(key) else {
            return Ok(None);
        };
        let n = match value {
            ParamValue::Int(n) => *n,
            ParamValue::Str(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| self.invalid(key, format!("must be an integer, got '{s}'")))?,
        };
        u32::try_from(n)
            .map(Some)
            .map_err(|_| self.invalid(key, format!("must be a non-negative integer, got {n}")))
    }

    pub fn u32_or(&self, key: &str, default: u32) -> Result<u32> {
        Ok(self.opt_u32(key)?.unwrap_or(default))
    }

    pub fn require_u32(&self, key: &str) -> Result<u32> {
        self.opt_u32(key)?
            .ok_or_else(|| self.invalid(key, "is required"))
    }

    /// Like [`opt_u32`](Self::opt_u32) but zero is rejected.
    pub fn opt_positive(&self, key: &str) -> Result<Option<u32>> {
        match self.opt_u32(key)? {
            Some(0) => Err(self.invalid(key, "must be greater than zero")),
            other => Ok(other),
        }
    }

    pub fn opt_str(&self, key: &str) -> Option<String> {
        self.params.get(key).map(ToString::to_string)
    }

    pub fn require_str(&self, key: &str) -> Result<String> {
        self.opt_str(key)
            .ok_or_else(|| self.invalid(key, "is required"))
    }

    pub fn opt_color(&self, key: &str) -> Result<Option<Color>> {
        match self.opt_str(key) {
            None => Ok(None),
            Some(raw) => Color::parse(&raw)
                .map(Some)
                .ok_or_else(|| self.invalid(key, format!("is not a color: '{raw}'"))),
        }
    }

    pub fn color_or(&self, key: &str, default: Color) -> Result<Color> {
        Ok(self.opt_color(key)?.unwrap_or(default))
    }

    /// One of a fixed set of words.
    pub fn choice<'c>(&self, key: &str, choices: &[&'c str], default: &'c str) -> Result<&'c str> {
        let Some(raw) = self.opt_str(key) else {
            return Ok(default);
        };
        choices
            .iter()
            .find(|c| **c == raw)
            .copied()
            .ok_or_else(|| self.invalid(key, format!("must be one of {}", choices.join(", "))))
    }
}
