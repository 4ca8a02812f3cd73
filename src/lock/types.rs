//! Lock error and snapshot types.

use super::token::ThreadToken;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Ways a [`SharedLock`](super::SharedLock) operation can fail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    /// The caller already holds the lock and the lock is not reentrant.
    #[error("lock '{lock}' is already held by the calling thread ({holder})")]
    InvalidState { lock: String, holder: ThreadToken },

    /// The caller tried to release a lock it does not hold.
    #[error("{caller} cannot release lock '{lock}' held by {}", describe_holder(.holder))]
    NotOwner {
        lock: String,
        caller: ThreadToken,
        holder: Option<ThreadToken>,
    },

    /// A bounded acquire gave up.
    #[error("timed out after {waited:?} waiting for lock '{lock}'")]
    Timeout { lock: String, waited: Duration },
}

fn describe_holder(holder: &Option<ThreadToken>) -> String {
    match holder {
        Some(token) => token.to_string(),
        None => "nobody".to_string(),
    }
}

/// Point-in-time view of a lock's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockSnapshot {
    /// The lock name.
    pub name: String,

    /// Whether some thread held the lock when the snapshot was taken.
    pub locked: bool,

    /// The recorded holder, if any.
    pub owner: Option<ThreadToken>,
}

impl std::fmt::Display for LockSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.owner {
            Some(owner) => write!(f, "{} (locked by {})", self.name, owner),
            None => write!(f, "{} (unlocked)", self.name),
        }
    }
}
