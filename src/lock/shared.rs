//! The shared mutual-exclusion primitive.

use super::guard::SharedLockGuard;
use super::token::ThreadToken;
use super::types::{LockError, LockSnapshot};
use std::hint;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const UNLOCKED: u64 = 0;

/// A non-reentrant lock shared between the threads of a process.
///
/// The whole state is one atomic word holding the owner's [`ThreadToken`]
/// (`0` when free). There is no waiter queue: waiting threads back off on the
/// word itself. A `fork` therefore copies a complete, self-consistent lock,
/// and the copied lock can be released in the child by the copied holder.
#[derive(Debug)]
pub struct SharedLock {
    name: String,
    owner: AtomicU64,
}

impl SharedLock {
    /// Create a new, unlocked lock.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: AtomicU64::new(UNLOCKED),
        }
    }

    /// Name used in logs and errors.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Block until the lock is free, then take it for the calling thread.
    ///
    /// Fails with [`LockError::InvalidState`] if the caller already holds it.
    pub fn acquire(&self) -> Result<(), LockError> {
        let me = self.enter()?;
        let mut backoff = Backoff::new();
        while !self.take(me) {
            backoff.snooze();
        }
        Ok(())
    }

    /// Like [`acquire`](Self::acquire), but give up after `timeout`.
    pub fn acquire_timeout(&self, timeout: Duration) -> Result<(), LockError> {
        let me = self.enter()?;
        let started = Instant::now();
        let mut backoff = Backoff::new();
        while !self.take(me) {
            let waited = started.elapsed();
            if waited >= timeout {
                return Err(LockError::Timeout {
                    lock: self.name.clone(),
                    waited,
                });
            }
            backoff.snooze();
        }
        Ok(())
    }

    /// Take the lock if it is free. Never blocks.
    pub fn try_acquire(&self) -> Result<bool, LockError> {
        let me = self.enter()?;
        Ok(self
            .owner
            .compare_exchange(UNLOCKED, me.as_raw(), Ordering::Acquire, Ordering::Relaxed)
            .is_ok())
    }

    /// Acquire the lock and wrap it in a guard that releases on drop.
    pub fn lock(&self) -> Result<SharedLockGuard<'_>, LockError> {
        self.acquire()?;
        Ok(SharedLockGuard::new(self))
    }

    /// Release the lock.
    ///
    /// Fails with [`LockError::NotOwner`] unless the calling thread is the
    /// recorded holder; the holder is left untouched in that case.
    pub fn release(&self) -> Result<(), LockError> {
        let me = ThreadToken::current();
        self.owner
            .compare_exchange(me.as_raw(), UNLOCKED, Ordering::Release, Ordering::Relaxed)
            .map(|_| ())
            .map_err(|actual| LockError::NotOwner {
                lock: self.name.clone(),
                caller: me,
                holder: ThreadToken::from_raw(actual),
            })
    }

    /// The thread currently recorded as holder.
    pub fn holder(&self) -> Option<ThreadToken> {
        ThreadToken::from_raw(self.owner.load(Ordering::Acquire))
    }

    pub fn is_locked(&self) -> bool {
        self.holder().is_some()
    }

    pub fn is_held_by_current_thread(&self) -> bool {
        self.holder() == Some(ThreadToken::current())
    }

    pub fn snapshot(&self) -> LockSnapshot {
        let owner = self.holder();
        LockSnapshot {
            name: self.name.clone(),
            locked: owner.is_some(),
            owner,
        }
    }

    fn enter(&self) -> Result<ThreadToken, LockError> {
        let me = ThreadToken::current();
        if self.holder() == Some(me) {
            return Err(LockError::InvalidState {
                lock: self.name.clone(),
                holder: me,
            });
        }
        Ok(me)
    }

    fn take(&self, me: ThreadToken) -> bool {
        self.owner
            .compare_exchange_weak(UNLOCKED, me.as_raw(), Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }
}

/// Spin, then yield, then sleep with a growing (capped) interval.
struct Backoff {
    step: u32,
}

impl Backoff {
    const SPIN_LIMIT: u32 = 6;
    const YIELD_LIMIT: u32 = 10;
    const SLEEP_SHIFT_LIMIT: u32 = 4;

    fn new() -> Self {
        Self { step: 0 }
    }

    fn snooze(&mut self) {
        if self.step <= Self::SPIN_LIMIT {
            for _ in 0..(1u32 << self.step) {
                hint::spin_loop();
            }
        } else if self.step <= Self::YIELD_LIMIT {
            thread::yield_now();
        } else {
            let shift = (self.step - Self::YIELD_LIMIT).min(Self::SLEEP_SHIFT_LIMIT);
            thread::sleep(Duration::from_micros(50 << shift));
        }
        if self.step <= Self::YIELD_LIMIT + Self::SLEEP_SHIFT_LIMIT {
            self.step += 1;
        }
    }
}
