//! Name → implementation lookup for transformations.

use super::backend::{Canvas, Dimensions};
use super::ops;
use super::spec::Params;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// One step of an image pipeline.
///
/// `plan` must report exactly the dimensions `apply` produces for the same
/// input size and parameters: the variation cache keys on the planned width
/// before any pixel is touched. Both validate parameters the same way.
pub trait Transformation: Send + Sync {
    fn name(&self) -> &'static str;

    /// Output dimensions for an input of `input` dimensions.
    fn plan(&self, input: Dimensions, params: &Params) -> Result<Dimensions>;

    fn apply(&self, canvas: Canvas, params: &Params) -> Result<Canvas>;
}

/// Registered transformations, built once at startup.
#[derive(Clone)]
pub struct TransformationRegistry {
    entries: HashMap<&'static str, Arc<dyn Transformation>>,
}

impl Default for TransformationRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl TransformationRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Every transformation that ships with the crate.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        for t in ops::builtins() {
            registry.register(t);
        }
        registry
    }

    /// Add or replace a transformation under its own name.
    pub fn register(&mut self, transformation: Arc<dyn Transformation>) {
        self.entries.insert(transformation.name(), transformation);
    }

    pub fn get(&self, name: &str) -> Result<&dyn Transformation> {
        self.entries
            .get(name)
            .map(|t| t.as_ref())
            .ok_or_else(|| Error::UnknownTransformation(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.entries.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
