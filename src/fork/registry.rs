//! Registry of fork handlers.

use super::handler::{ForkGuard, ForkHandler};
use crate::error::{GuardError, Result};
use crate::lock::SharedLock;
use std::sync::{Arc, OnceLock};

static INSTALLED: OnceLock<HookRegistry> = OnceLock::new();

/// Which process a post-fork phase runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkSide {
    Parent,
    Child,
}

impl std::fmt::Display for ForkSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForkSide::Parent => write!(f, "parent"),
            ForkSide::Child => write!(f, "child"),
        }
    }
}

/// Ordered set of [`ForkHandler`]s.
///
/// Handlers are prepared in reverse registration order and restored in
/// registration order, matching `pthread_atfork`. Registering one handler per
/// lock in a fixed order therefore also fixes the order in which a fork takes
/// those locks.
///
/// A registry is frozen once a [`Duplicator`](super::Duplicator) borrows it.
#[derive(Default)]
pub struct HookRegistry {
    handlers: Vec<Box<dyn ForkHandler>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler.
    ///
    /// Fails with `HookOrderingViolation` if a handler for the same resource
    /// is already registered.
    pub fn register(&mut self, handler: impl ForkHandler + 'static) -> Result<()> {
        if let Some(key) = handler.key()
            && let Some(existing) = self.handlers.iter().find(|h| h.key() == Some(key))
        {
            return Err(GuardError::HookOrderingViolation(format!(
                "fork hooks for '{}' are already registered",
                existing.name()
            )));
        }

        tracing::debug!(handler = handler.name(), "registered fork handler");
        self.handlers.push(Box::new(handler));
        Ok(())
    }

    /// Register a [`ForkGuard`] for `lock`.
    pub fn guard_lock(&mut self, lock: &Arc<SharedLock>) -> Result<()> {
        self.register(ForkGuard::new(Arc::clone(lock)))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Handler names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.handlers.iter().map(|h| h.name().to_string()).collect()
    }

    /// Make this the process-wide registry. Can only happen once per process.
    pub fn install(self) -> Result<&'static HookRegistry> {
        let mut pending = Some(self);
        let installed = INSTALLED.get_or_init(|| pending.take().unwrap_or_default());
        if pending.is_some() {
            return Err(GuardError::HookOrderingViolation(
                "a process-wide hook registry is already installed".to_string(),
            ));
        }
        Ok(installed)
    }

    /// The process-wide registry, if one was installed.
    #[cfg(test)]
    pub fn installed() -> Option<&'static HookRegistry> {
        INSTALLED.get()
    }

    /// Run every `before_fork` hook, last registered first.
    ///
    /// If one fails, the handlers already prepared are restored through their
    /// parent hooks before the error is returned.
    pub(crate) fn prepare(&self) -> Result<()> {
        for (idx, handler) in self.handlers.iter().enumerate().rev() {
            if let Err(e) = handler.before_fork() {
                for prepared in &self.handlers[idx + 1..] {
                    if let Err(undo) = prepared.after_fork_parent() {
                        tracing::error!(
                            handler = prepared.name(),
                            error = %undo,
                            "failed to roll back pre-fork hook"
                        );
                    }
                }
                return Err(GuardError::DuplicationFailure(format!(
                    "pre-fork hook '{}' failed: {}",
                    handler.name(),
                    e
                )));
            }
        }
        Ok(())
    }

    /// Run every post-fork hook for `side`, first registered first.
    ///
    /// All hooks run even if one fails; the first error is returned.
    pub(crate) fn finish(&self, side: ForkSide) -> Result<()> {
        let mut first_error = None;
        for handler in &self.handlers {
            let result = match side {
                ForkSide::Parent => handler.after_fork_parent(),
                ForkSide::Child => handler.after_fork_child(),
            };
            if let Err(e) = result
                && first_error.is_none()
            {
                first_error = Some(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("handlers", &self.names())
            .finish()
    }
}
