//! Error types for forkguard.
//!
//! Uses thiserror for derive macros. Every top-level error maps to an exit code
//! so the CLI and forked children report failures the same way.

use crate::exit_codes;
use crate::lock::LockError;
use thiserror::Error;

/// Main error type for forkguard operations.
#[derive(Error, Debug)]
pub enum GuardError {
    /// A lock was used against its contract (programmer error).
    #[error("Lock misuse: {0}")]
    LockMisuse(#[from] LockError),

    /// The duplication call failed, or a pre-fork hook refused to let it proceed.
    #[error("Duplication failed: {0}")]
    DuplicationFailure(String),

    /// Hook registration or a post-fork hook observed state the protocol forbids.
    #[error("Hook ordering violation: {0}")]
    HookOrderingViolation(String),

    /// Invalid arguments or configuration.
    #[error("{0}")]
    UserError(String),

    /// The worker thread failed or panicked.
    #[error("Worker failed: {0}")]
    WorkerError(String),

    /// Waiting on or signalling a child process failed.
    #[error("Child wait failed: {0}")]
    ChildWaitFailure(String),
}

impl GuardError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            GuardError::LockMisuse(LockError::Timeout { .. }) => exit_codes::LOCK_HAZARD,
            GuardError::LockMisuse(_) => exit_codes::LOCK_MISUSE,
            GuardError::DuplicationFailure(_) => exit_codes::DUPLICATION_FAILURE,
            GuardError::HookOrderingViolation(_) => exit_codes::INTERNAL_FAILURE,
            GuardError::UserError(_) => exit_codes::USER_ERROR,
            GuardError::WorkerError(_) => exit_codes::INTERNAL_FAILURE,
            GuardError::ChildWaitFailure(_) => exit_codes::INTERNAL_FAILURE,
        }
    }
}

/// Result type alias for forkguard operations.
pub type Result<T> = std::result::Result<T, GuardError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::ThreadToken;
    use std::time::Duration;

    #[test]
    fn duplication_failure_exits_with_one() {
        let err = GuardError::DuplicationFailure("fork: EAGAIN".to_string());
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn lock_misuse_has_correct_exit_code() {
        let err = GuardError::from(LockError::NotOwner {
            lock: "shared".to_string(),
            caller: ThreadToken::current(),
            holder: None,
        });
        assert_eq!(err.exit_code(), exit_codes::LOCK_MISUSE);
    }

    #[test]
    fn lock_timeout_is_reported_as_hazard() {
        let err = GuardError::from(LockError::Timeout {
            lock: "shared".to_string(),
            waited: Duration::from_millis(10),
        });
        assert_eq!(err.exit_code(), exit_codes::LOCK_HAZARD);
    }

    #[test]
    fn internal_errors_share_an_exit_code() {
        let hook = GuardError::HookOrderingViolation("registered twice".to_string());
        let worker = GuardError::WorkerError("panicked".to_string());
        assert_eq!(hook.exit_code(), exit_codes::INTERNAL_FAILURE);
        assert_eq!(worker.exit_code(), exit_codes::INTERNAL_FAILURE);
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = GuardError::DuplicationFailure("EAGAIN".to_string());
        assert_eq!(err.to_string(), "Duplication failed: EAGAIN");

        let err = GuardError::UserError("rounds must be greater than 0".to_string());
        assert_eq!(err.to_string(), "rounds must be greater than 0");
    }
}
