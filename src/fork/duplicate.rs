//! The duplication facility: fork with registered hooks around it.

use super::registry::{ForkSide, HookRegistry};
use crate::error::{GuardError, Result};
use nix::unistd::{ForkResult, Pid, fork};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Which side of a fork the caller is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Duplication {
    /// Still in the original process.
    Parent {
        child: Pid,
        /// Time spent in the pre-fork hooks, i.e. waiting for guarded locks.
        prepare_wait: Duration,
    },
    /// In the new process.
    Child,
}

/// Forks the process, running a frozen [`HookRegistry`] around each fork.
///
/// Duplications through one `Duplicator` never overlap: a call made while
/// another is in flight fails instead of racing the hooks.
#[derive(Debug)]
pub struct Duplicator<'r> {
    registry: &'r HookRegistry,
    in_progress: AtomicBool,
    completed: AtomicU64,
}

impl<'r> Duplicator<'r> {
    pub fn new(registry: &'r HookRegistry) -> Self {
        Self {
            registry,
            in_progress: AtomicBool::new(false),
            completed: AtomicU64::new(0),
        }
    }

    /// Number of forks this duplicator has performed in the current process.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Fork the calling process.
    ///
    /// Pre-fork hooks run first; if any fails, no child is created and
    /// `DuplicationFailure` is returned. After the fork, the parent runs the
    /// parent hooks and the child runs the child hooks. A post-fork hook
    /// failure means the protocol was broken, and the process aborts.
    pub fn duplicate(&self) -> Result<Duplication> {
        if self.in_progress.swap(true, Ordering::AcqRel) {
            return Err(GuardError::DuplicationFailure(
                "another duplication is already in progress".to_string(),
            ));
        }
        let _in_progress = InProgress(&self.in_progress);

        let started = Instant::now();
        self.registry.prepare()?;
        let prepare_wait = started.elapsed();
        tracing::trace!(?prepare_wait, "pre-fork hooks complete");

        // SAFETY: every lock registered with the hooks is held by this thread
        // until the post-fork hooks run. The child only runs the child hooks
        // before returning to the caller.
        match unsafe { fork() } {
            Ok(ForkResult::Parent { child }) => {
                self.finish(ForkSide::Parent);
                self.completed.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(child = child.as_raw(), "forked");
                Ok(Duplication::Parent {
                    child,
                    prepare_wait,
                })
            }
            Ok(ForkResult::Child) => {
                self.finish(ForkSide::Child);
                self.completed.store(0, Ordering::Relaxed);
                Ok(Duplication::Child)
            }
            Err(errno) => {
                self.finish(ForkSide::Parent);
                Err(GuardError::DuplicationFailure(format!("fork: {}", errno)))
            }
        }
    }

    fn finish(&self, side: ForkSide) {
        if let Err(e) = self.registry.finish(side) {
            tracing::error!(%side, error = %e, "post-fork hook failed, aborting");
            std::process::abort();
        }
    }
}

struct InProgress<'a>(&'a AtomicBool);

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Terminate a forked child immediately with `code`.
///
/// Skips atexit handlers and stdio flushing, which belong to the parent.
pub fn exit_child(code: i32) -> ! {
    // SAFETY: `_exit` is async-signal-safe and never returns.
    unsafe { libc::_exit(code) }
}
