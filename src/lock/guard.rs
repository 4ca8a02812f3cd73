//! RAII guard for a held [`SharedLock`].

use super::shared::SharedLock;
use super::types::LockError;

/// Releases the lock when dropped.
///
/// If the release fails during drop, a warning is logged but no panic occurs.
#[derive(Debug)]
pub struct SharedLockGuard<'a> {
    lock: &'a SharedLock,

    /// Whether the lock has been released manually.
    released: bool,
}

impl<'a> SharedLockGuard<'a> {
    pub(super) fn new(lock: &'a SharedLock) -> Self {
        Self {
            lock,
            released: false,
        }
    }

    /// Manually release the lock and observe the result.
    pub fn release(mut self) -> Result<(), LockError> {
        self.released = true;
        self.lock.release()
    }
}

impl Drop for SharedLockGuard<'_> {
    fn drop(&mut self) {
        if !self.released
            && let Err(e) = self.lock.release()
        {
            tracing::warn!(lock = self.lock.name(), error = %e, "failed to release lock");
        }
    }
}
