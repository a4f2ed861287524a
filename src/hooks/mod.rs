//! Priority-ordered hooks around named operations.
//!
//! A hook subscribes to event keys of the form `<operation>PreExec` or
//! `<operation>PostExec`, each with an integer priority. For one operation
//! the [`HookRegistry`] builds a [`HookPipeline`]: the matching bindings of
//! each phase, ascending by priority, ties in registration order.
//!
//! | Event key | Runs |
//! |---|---|
//! | `getImagePreExec` | before the variation cache is consulted; may set the output |
//! | `getImagePostExec` | after rendering, with the output in the context |
//! | `addImagePreExec` | before the original is hashed and stored |
//! | `deleteImagePostExec` | after the original and its variations are gone |
//!
//! The first failing hook aborts its phase; the engine surfaces it as
//! [`Error::HookExecution`](crate::Error::HookExecution).

pub mod builtin;
mod context;
mod pipeline;

pub use context::OperationContext;
pub use pipeline::{HookPipeline, HookRegistry, parse_event_key};

use std::fmt;
use thiserror::Error;

/// When a hook runs relative to the operation body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    PreExec,
    PostExec,
}

impl Phase {
    /// Suffix used in event keys (`getImagePreExec`).
    pub fn suffix(self) -> &'static str {
        match self {
            Phase::PreExec => "PreExec",
            Phase::PostExec => "PostExec",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::PreExec => write!(f, "preExec"),
            Phase::PostExec => write!(f, "postExec"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HookError {
    /// The hook refused to let the operation continue.
    #[error("{0}")]
    Rejected(String),
    #[error("Invalid event key '{0}' (expected <operation>PreExec or <operation>PostExec)")]
    InvalidEventKey(String),
    #[error("Unknown hook '{0}'")]
    UnknownHook(String),
    #[error("Invalid parameter for hook '{hook}': {message}")]
    InvalidParam { hook: String, message: String },
}

/// A unit of cross-cutting behaviour.
///
/// Hooks hold no per-request state; everything a hook may read or change
/// goes through the [`OperationContext`].
pub trait Hook: Send + Sync {
    fn name(&self) -> &str;

    /// Event keys this hook subscribes to, with priorities. Used by
    /// [`HookRegistry::register`]; configuration may override them.
    fn events(&self) -> Vec<(String, i32)> {
        Vec::new()
    }

    fn exec(&self, ctx: &mut OperationContext) -> Result<(), HookError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_display_and_suffix() {
        assert_eq!(Phase::PreExec.to_string(), "preExec");
        assert_eq!(Phase::PostExec.to_string(), "postExec");
        assert_eq!(Phase::PreExec.suffix(), "PreExec");
        assert_eq!(Phase::PostExec.suffix(), "PostExec");
    }

    #[test]
    fn hook_error_messages() {
        assert_eq!(HookError::Rejected("too long".into()).to_string(), "too long");
        assert_eq!(
            HookError::UnknownHook("audit".into()).to_string(),
            "Unknown hook 'audit'"
        );
    }
}
