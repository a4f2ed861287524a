//! Hook registration and per-operation scheduling.

use super::{Hook, HookError, OperationContext, Phase};
use crate::error::{Error, Result};
use std::sync::Arc;

/// One hook bound to one phase of one operation.
#[derive(Clone)]
struct Binding {
    operation: String,
    phase: Phase,
    priority: i32,
    hook: Arc<dyn Hook>,
}

/// Split an event key into operation and phase.
///
/// `getImagePreExec` → `("getImage", PreExec)`. A key without a phase
/// suffix, or with nothing in front of it, is `None`.
pub fn parse_event_key(key: &str) -> Option<(&str, Phase)> {
    [Phase::PreExec, Phase::PostExec]
        .into_iter()
        .find_map(|phase| {
            key.strip_suffix(phase.suffix())
                .filter(|op| !op.is_empty())
                .map(|op| (op, phase))
        })
}

/// All hook bindings known to the service.
///
/// Built once at startup; [`pipeline`](Self::pipeline) hands out immutable
/// per-operation schedules.
#[derive(Default, Clone)]
pub struct HookRegistry {
    bindings: Vec<Binding>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook under the event keys it declares itself.
    pub fn register(&mut self, hook: Arc<dyn Hook>) -> std::result::Result<(), HookError> {
        let events = hook.events();
        self.register_with_events(hook, events)
    }

    /// Register a hook under explicit event keys.
    ///
    /// Every key is validated before any binding is added, so a bad key
    /// leaves the registry untouched.
    pub fn register_with_events<I, K>(
        &mut self,
        hook: Arc<dyn Hook>,
        events: I,
    ) -> std::result::Result<(), HookError>
    where
        I: IntoIterator<Item = (K, i32)>,
        K: AsRef<str>,
    {
        let mut parsed = Vec::new();
        for (key, priority) in events {
            let key = key.as_ref();
            let (operation, phase) =
                parse_event_key(key).ok_or_else(|| HookError::InvalidEventKey(key.to_string()))?;
            parsed.push((operation.to_string(), phase, priority));
        }

        for (operation, phase, priority) in parsed {
            self.bind(Arc::clone(&hook), operation, phase, priority);
        }
        Ok(())
    }

    /// Bind a hook to one phase of one operation.
    pub fn bind(
        &mut self,
        hook: Arc<dyn Hook>,
        operation: impl Into<String>,
        phase: Phase,
        priority: i32,
    ) {
        let operation = operation.into();
        tracing::debug!(hook = hook.name(), %operation, %phase, priority, "Registered hook");
        self.bindings.push(Binding {
            operation,
            phase,
            priority,
            hook,
        });
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Schedule for one operation: each phase ascending by priority.
    pub fn pipeline(&self, operation: &str) -> HookPipeline {
        let select = |phase: Phase| {
            let mut bound: Vec<&Binding> = self
                .bindings
                .iter()
                .filter(|b| b.operation == operation && b.phase == phase)
                .collect();
            // Stable: equal priorities keep registration order
            bound.sort_by_key(|b| b.priority);
            bound.into_iter().map(|b| Arc::clone(&b.hook)).collect()
        };

        HookPipeline {
            pre: select(Phase::PreExec),
            post: select(Phase::PostExec),
        }
    }
}

/// Ordered hooks for one operation.
pub struct HookPipeline {
    pre: Vec<Arc<dyn Hook>>,
    post: Vec<Arc<dyn Hook>>,
}

impl HookPipeline {
    pub fn pre_exec(&self, ctx: &mut OperationContext) -> Result<()> {
        run_phase(&self.pre, Phase::PreExec, ctx)
    }

    pub fn post_exec(&self, ctx: &mut OperationContext) -> Result<()> {
        run_phase(&self.post, Phase::PostExec, ctx)
    }

    /// Hook names in execution order for a phase.
    pub fn names(&self, phase: Phase) -> Vec<&str> {
        let hooks = match phase {
            Phase::PreExec => &self.pre,
            Phase::PostExec => &self.post,
        };
        hooks.iter().map(|h| h.name()).collect()
    }
}

fn run_phase(hooks: &[Arc<dyn Hook>], phase: Phase, ctx: &mut OperationContext) -> Result<()> {
    ctx.set_phase(phase);
    for hook in hooks {
        hook.exec(ctx).map_err(|e| {
            tracing::warn!(hook = hook.name(), %phase, error = %e, "Hook failed");
            Error::HookExecution {
                hook: hook.name().to_string(),
                phase,
                message: e.to_string(),
            }
        })?;
    }
    Ok(())
}
