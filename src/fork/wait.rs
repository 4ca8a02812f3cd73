//! Bounded waiting on a forked child.

use crate::error::{GuardError, Result};
use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use serde::Serialize;
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// How a child process ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChildStatus {
    /// The child exited on its own.
    Exited { code: i32 },
    /// The child was killed by a signal it did not expect.
    Signaled { signal: String },
    /// The child was still running at the deadline and was killed.
    TimedOut { waited_ms: u64 },
}

impl ChildStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ChildStatus::Exited { code: 0 })
    }
}

impl std::fmt::Display for ChildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChildStatus::Exited { code } => write!(f, "exited with {}", code),
            ChildStatus::Signaled { signal } => write!(f, "killed by {}", signal),
            ChildStatus::TimedOut { waited_ms } => {
                write!(f, "still blocked after {}ms, killed", waited_ms)
            }
        }
    }
}

/// Wait up to `timeout` for `child` to exit.
///
/// A child still running at the deadline is sent `SIGKILL` and reaped, and
/// [`ChildStatus::TimedOut`] is returned. A child that exits on its own just
/// before the kill is reported with its real status.
pub fn wait_for_child(child: Pid, timeout: Duration) -> Result<ChildStatus> {
    let started = Instant::now();
    loop {
        match waitpid(child, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(ChildStatus::Exited { code }),
            Ok(WaitStatus::Signaled(_, signal, _)) => {
                return Ok(ChildStatus::Signaled {
                    signal: signal.as_str().to_string(),
                });
            }
            Ok(_) => {}
            Err(Errno::EINTR) => continue,
            Err(e) => {
                return Err(GuardError::ChildWaitFailure(format!(
                    "waitpid({}): {}",
                    child, e
                )));
            }
        }

        let waited = started.elapsed();
        if waited >= timeout {
            let reaped = kill_and_reap(child)?;
            return Ok(status_after_kill(reaped, waited));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Classify what `waitpid` returned after the deadline kill.
///
/// Only our own `SIGKILL` (or a child already gone) counts as a timeout.
fn status_after_kill(reaped: Option<WaitStatus>, waited: Duration) -> ChildStatus {
    match reaped {
        Some(WaitStatus::Exited(_, code)) => ChildStatus::Exited { code },
        Some(WaitStatus::Signaled(_, signal, _)) if signal != Signal::SIGKILL => {
            ChildStatus::Signaled {
                signal: signal.as_str().to_string(),
            }
        }
        _ => ChildStatus::TimedOut {
            waited_ms: waited.as_millis() as u64,
        },
    }
}

/// Kill `child` and reap it, returning the status `waitpid` reported.
fn kill_and_reap(child: Pid) -> Result<Option<WaitStatus>> {
    match kill(child, Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => {
            return Err(GuardError::ChildWaitFailure(format!(
                "kill({}): {}",
                child, e
            )));
        }
    }
    loop {
        match waitpid(child, None) {
            Ok(status @ (WaitStatus::Exited(..) | WaitStatus::Signaled(..))) => {
                return Ok(Some(status));
            }
            Ok(_) | Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => return Ok(None),
            Err(e) => {
                return Err(GuardError::ChildWaitFailure(format!(
                    "waitpid({}): {}",
                    child, e
                )));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAITED: Duration = Duration::from_millis(250);

    #[test]
    fn exit_racing_the_kill_keeps_its_code() {
        let status = status_after_kill(Some(WaitStatus::Exited(Pid::from_raw(42), 0)), WAITED);
        assert_eq!(status, ChildStatus::Exited { code: 0 });
        assert!(status.is_success());
    }

    #[test]
    fn our_own_kill_is_a_timeout() {
        let reaped = WaitStatus::Signaled(Pid::from_raw(42), Signal::SIGKILL, false);
        assert_eq!(
            status_after_kill(Some(reaped), WAITED),
            ChildStatus::TimedOut { waited_ms: 250 }
        );
        assert_eq!(
            status_after_kill(None, WAITED),
            ChildStatus::TimedOut { waited_ms: 250 }
        );
    }

    #[test]
    fn other_signal_racing_the_kill_is_reported() {
        let reaped = WaitStatus::Signaled(Pid::from_raw(42), Signal::SIGABRT, true);
        assert_eq!(
            status_after_kill(Some(reaped), WAITED),
            ChildStatus::Signaled {
                signal: "SIGABRT".to_string()
            }
        );
    }
}
