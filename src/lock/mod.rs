//! Locking primitive shared between the threads of one process.
//!
//! # Ownership
//!
//! Ownership is recorded per thread through a [`ThreadToken`]. Only the
//! recorded holder may release; a second acquire by the holder is rejected
//! rather than deadlocking.
//!
//! # Fork behaviour
//!
//! The lock is a single atomic word, so `fork` copies it exactly. A lock held
//! by some other thread at fork time stays held forever in the child, because
//! that thread does not exist there. See [`crate::fork`] for the hooks that
//! rule this out.

mod guard;
mod shared;
mod token;
mod types;

#[cfg(test)]
mod tests;

pub use guard::SharedLockGuard;
pub use shared::SharedLock;
pub use token::ThreadToken;
pub use types::{LockError, LockSnapshot};
