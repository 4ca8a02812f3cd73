//! Per-thread identity used to record lock ownership.

use serde::Serialize;
use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static TOKEN: ThreadToken = ThreadToken::allocate();
}

/// Opaque, process-unique identity of a thread.
///
/// The token lives in thread-local storage, which `fork` copies along with the
/// calling thread. The only thread of a forked child therefore carries the same
/// token as the thread that forked, and is recognised as the holder of any lock
/// that thread held at the time of the fork.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ThreadToken(NonZeroU64);

impl ThreadToken {
    /// Token of the calling thread, allocated on first use.
    pub fn current() -> Self {
        TOKEN.with(|token| *token)
    }

    /// Rebuild a token from its raw lock-word value. `0` means "no thread".
    pub(crate) fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    pub(crate) fn as_raw(self) -> u64 {
        self.0.get()
    }

    fn allocate() -> Self {
        let raw = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
        Self(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }
}

impl fmt::Display for ThreadToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "thread#{}", self.0)
    }
}
