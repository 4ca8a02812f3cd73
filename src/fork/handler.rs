//! The three-phase fork hook interface and the lock guard that implements it.

use crate::error::{GuardError, Result};
use crate::lock::SharedLock;
use std::sync::Arc;

/// Callbacks run by a [`Duplicator`](super::Duplicator) around every fork.
///
/// `before_fork` runs in the forking thread before the child exists. Exactly
/// one of `after_fork_parent` or `after_fork_child` then runs in each
/// resulting process, in the thread that returned from `fork`.
pub trait ForkHandler: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Identity of the resource this handler protects. A registry refuses two
    /// handlers with the same key.
    fn key(&self) -> Option<usize> {
        None
    }

    /// Quiesce the resource. An error stops the fork from happening.
    fn before_fork(&self) -> Result<()>;

    /// Restore the resource in the original process.
    fn after_fork_parent(&self) -> Result<()>;

    /// Restore the resource in the new process.
    fn after_fork_child(&self) -> Result<()>;
}

/// Keeps one [`SharedLock`] consistent across fork.
///
/// The pre-fork hook takes the lock, so the fork waits for any critical
/// section running on another thread to end. Both post-fork hooks release it:
/// the parent gives back its transient hold, and the child's only thread is a
/// copy of the forking thread and so is the recorded holder of the copy.
#[derive(Debug, Clone)]
pub struct ForkGuard {
    lock: Arc<SharedLock>,
}

impl ForkGuard {
    pub fn new(lock: Arc<SharedLock>) -> Self {
        Self { lock }
    }

    fn release_after_fork(&self, side: &str) -> Result<()> {
        match self.lock.holder() {
            None => {
                return Err(GuardError::HookOrderingViolation(format!(
                    "lock '{}' was already unlocked when the {} hook ran",
                    self.lock.name(),
                    side
                )));
            }
            Some(holder) if !self.lock.is_held_by_current_thread() => {
                return Err(GuardError::HookOrderingViolation(format!(
                    "lock '{}' is held by {} instead of the forking thread when the {} hook ran",
                    self.lock.name(),
                    holder,
                    side
                )));
            }
            Some(_) => {}
        }

        self.lock.release().map_err(|e| {
            GuardError::HookOrderingViolation(format!("{} hook could not release: {}", side, e))
        })
    }
}

impl ForkHandler for ForkGuard {
    fn name(&self) -> &str {
        self.lock.name()
    }

    fn key(&self) -> Option<usize> {
        Some(Arc::as_ptr(&self.lock) as usize)
    }

    fn before_fork(&self) -> Result<()> {
        self.lock.acquire()?;
        Ok(())
    }

    fn after_fork_parent(&self) -> Result<()> {
        self.release_after_fork("parent")
    }

    fn after_fork_child(&self) -> Result<()> {
        self.release_after_fork("child")
    }
}
