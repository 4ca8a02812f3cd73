//! Exit code constants for the forkguard CLI.
//!
//! The same codes are used by the forked child to report its lock probe back
//! to the parent:
//! - 0: Success (every child acquired the lock within its bounded wait)
//! - 1: Duplication failure (fork or a pre-fork hook failed)
//! - 2: Lock hazard (a child blocked on the lock past its bounded wait)
//! - 3: User error (bad args, invalid config)
//! - 4: Lock misuse (release by non-owner, reentrant acquire)
//! - 5: Internal failure (worker thread, hook registration)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// The duplication call itself failed, or a pre-fork hook refused to run.
pub const DUPLICATION_FAILURE: i32 = 1;

/// A child process could not acquire the shared lock within its bounded wait.
pub const LOCK_HAZARD: i32 = 2;

/// User error: bad arguments or invalid configuration.
pub const USER_ERROR: i32 = 3;

/// Lock misuse: a thread released a lock it does not hold, or re-acquired one it does.
pub const LOCK_MISUSE: i32 = 4;

/// Internal failure: worker thread died or hooks were registered inconsistently.
pub const INTERNAL_FAILURE: i32 = 5;
