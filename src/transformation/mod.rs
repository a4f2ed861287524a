//! Image transformations: parsing, lookup and rendering.
//!
//! | Stage | Module |
//! |---|---|
//! | **Parse** `"border:color=fff,width=2"` | [`spec`] → [`TransformationDescriptor`] |
//! | **Look up** a name | [`registry`] → [`Transformation`] |
//! | **Plan** output size from stored dimensions | [`Transformation::plan`] |
//! | **Render** decode → apply each step → encode | [`render`] over an [`ImageBackend`] |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Typed parameter access, colors, quality
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Ops**: The built-in transformations

pub mod backend;
pub mod calculations;
mod ops;
pub mod params;
pub mod registry;
pub mod render;
pub mod rust_backend;
pub mod spec;

pub use backend::{BackendError, Canvas, Dimensions, Identified, ImageBackend};
pub use params::{Color, Quality, format_color};
pub use registry::{Transformation, TransformationRegistry};
pub use render::{DEFAULT_MAX_DIMENSION, Rendered, Renderer};
pub use rust_backend::RustBackend;
pub use spec::{DEFAULT_NUMERIC_KEYS, ParamValue, Params, SpecParser, TransformationDescriptor};
