//! Hooks that ship with the service and can be enabled from config.
//!
//! | Name | Default events | Effect |
//! |---|---|---|
//! | `request_log` | `getImagePreExec = 0`, `getImagePostExec = 100` | logs each phase at info level |
//! | `pipeline_limit` | `getImagePreExec = 0` | rejects pipelines longer than `max` (default 10) |

use super::{Hook, HookError, HookRegistry, OperationContext, Phase};
use crate::config::HookConfig;
use std::sync::Arc;

pub const REQUEST_LOG: &str = "request_log";
pub const PIPELINE_LIMIT: &str = "pipeline_limit";

const DEFAULT_PIPELINE_MAX: usize = 10;

/// Names accepted by [`create`].
pub fn names() -> &'static [&'static str] {
    &[REQUEST_LOG, PIPELINE_LIMIT]
}

/// Build a built-in hook from its config name and parameters.
pub fn create(name: &str, params: &toml::Table) -> Result<Arc<dyn Hook>, HookError> {
    match name {
        REQUEST_LOG => Ok(Arc::new(RequestLog)),
        PIPELINE_LIMIT => {
            let max = match params.get("max") {
                None => DEFAULT_PIPELINE_MAX,
                Some(toml::Value::Integer(n)) if *n >= 0 => *n as usize,
                Some(other) => {
                    return Err(HookError::InvalidParam {
                        hook: name.to_string(),
                        message: format!("max must be a non-negative integer, got {other}"),
                    });
                }
            };
            Ok(Arc::new(PipelineLimit { max }))
        }
        other => Err(HookError::UnknownHook(other.to_string())),
    }
}

/// Build a registry from `[[hooks]]` entries, registered in file order.
///
/// Entries without an `events` table use the hook's own defaults.
pub fn registry(entries: &[HookConfig]) -> Result<HookRegistry, HookError> {
    let mut registry = HookRegistry::new();
    for entry in entries {
        let hook = create(&entry.name, &entry.params)?;
        match &entry.events {
            Some(events) => {
                registry.register_with_events(hook, events.iter().map(|(k, p)| (k, *p)))?
            }
            None => registry.register(hook)?,
        }
    }
    Ok(registry)
}

/// Logs every phase it is bound to.
pub struct RequestLog;

impl Hook for RequestLog {
    fn name(&self) -> &str {
        REQUEST_LOG
    }

    fn events(&self) -> Vec<(String, i32)> {
        vec![
            ("getImagePreExec".into(), 0),
            ("getImagePostExec".into(), 100),
        ]
    }

    fn exec(&self, ctx: &mut OperationContext) -> Result<(), HookError> {
        let identifier = ctx.image_identifier().unwrap_or("-");
        match ctx.phase() {
            Phase::PreExec => tracing::info!(
                operation = ctx.operation(),
                account = ctx.account(),
                identifier,
                transformations = ctx.transformations().len(),
                "Request started"
            ),
            Phase::PostExec => tracing::info!(
                operation = ctx.operation(),
                account = ctx.account(),
                identifier,
                bytes = ctx.output().map_or(0, |r| r.blob.len()),
                "Request finished"
            ),
        }
        Ok(())
    }
}

/// Caps the number of transformations in one request.
pub struct PipelineLimit {
    pub max: usize,
}

impl Hook for PipelineLimit {
    fn name(&self) -> &str {
        PIPELINE_LIMIT
    }

    fn events(&self) -> Vec<(String, i32)> {
        vec![("getImagePreExec".into(), 0)]
    }

    fn exec(&self, ctx: &mut OperationContext) -> Result<(), HookError> {
        let count = ctx.transformations().len();
        if count > self.max {
            return Err(HookError::Rejected(format!(
                "{count} transformations requested, at most {} allowed",
                self.max
            )));
        }
        Ok(())
    }
}
