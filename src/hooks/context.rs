//! Per-request state shared with hooks.
//!
//! The operation name and the image key are fixed at construction; hooks
//! can read them but not redirect the request. The transformation list,
//! annotations and output are open for hooks to change.

use super::Phase;
use crate::transformation::{Rendered, TransformationDescriptor};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct OperationContext {
    operation: String,
    account: String,
    image_identifier: Option<String>,
    phase: Phase,
    transformations: Vec<TransformationDescriptor>,
    annotations: BTreeMap<String, String>,
    output: Option<Rendered>,
}

impl OperationContext {
    pub fn new(operation: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            account: account.into(),
            image_identifier: None,
            phase: Phase::PreExec,
            transformations: Vec::new(),
            annotations: BTreeMap::new(),
            output: None,
        }
    }

    pub fn with_image(mut self, identifier: impl Into<String>) -> Self {
        self.image_identifier = Some(identifier.into());
        self
    }

    pub fn with_transformations(mut self, transformations: Vec<TransformationDescriptor>) -> Self {
        self.transformations = transformations;
        self
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn image_identifier(&self) -> Option<&str> {
        self.image_identifier.as_deref()
    }

    /// Phase currently executing.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub fn transformations(&self) -> &[TransformationDescriptor] {
        &self.transformations
    }

    pub fn transformations_mut(&mut self) -> &mut Vec<TransformationDescriptor> {
        &mut self.transformations
    }

    pub fn annotate(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.annotations.insert(key.into(), value.into());
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }

    pub fn annotations(&self) -> &BTreeMap<String, String> {
        &self.annotations
    }

    pub fn output(&self) -> Option<&Rendered> {
        self.output.as_ref()
    }

    /// A pre-exec hook that sets the output short-circuits rendering.
    pub fn set_output(&mut self, rendered: Rendered) {
        self.output = Some(rendered);
    }

    pub fn take_output(&mut self) -> Option<Rendered> {
        self.output.take()
    }
}
