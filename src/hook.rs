//! Compile hooks: callbacks around each compiled declaration group.
//!
//! A hook can veto a group from `on_start`, rewrite the finished declarations
//! in `on_success`, and replace the reported error in `on_failure`. Hooks are
//! shared between scope workers and must be `Sync`.

use std::fmt;

use crate::emit::Declaration;
use crate::error::{Error, HookError};

/// The group of declarations a hook is called for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileTarget<'a> {
    /// One entity of a scope, together with its identifier views.
    Entity { scope: &'a str, name: &'a str },
    Enum { name: &'a str },
    Structure { name: &'a str },
}

impl fmt::Display for CompileTarget<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity { scope, name } => write!(f, "entity '{}' in scope '{}'", name, scope),
            Self::Enum { name } => write!(f, "enum '{}'", name),
            Self::Structure { name } => write!(f, "structure '{}'", name),
        }
    }
}

pub trait CompileHooks: Sync {
    fn on_start(&self, _target: CompileTarget<'_>) -> Result<(), HookError> {
        Ok(())
    }

    /// Called with the finished declarations; the entity (or enum, or
    /// structure) comes first, followed by its views.
    fn on_success(
        &self,
        _target: CompileTarget<'_>,
        _declarations: &mut [Declaration],
    ) -> Result<(), HookError> {
        Ok(())
    }

    fn on_failure(&self, _target: CompileTarget<'_>, error: HookError) -> HookError {
        error
    }
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl CompileHooks for NoHooks {}

/// Run `declarations` through the hooks for `target`.
pub(crate) fn run_hooks(
    hooks: &dyn CompileHooks,
    target: CompileTarget<'_>,
    mut declarations: Vec<Declaration>,
) -> Result<Vec<Declaration>, Error> {
    let outcome = hooks
        .on_start(target)
        .and_then(|()| hooks.on_success(target, &mut declarations));

    match outcome {
        Ok(()) => Ok(declarations),
        Err(err) => {
            tracing::warn!(compile_target = %target, error = %err, "compile hook failed");
            Err(Error::Hook {
                target: target.to_string(),
                source: hooks.on_failure(target, err),
            })
        }
    }
}
