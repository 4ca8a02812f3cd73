//! ScenarioConfig struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parameters of the fork scenario.
///
/// Defaults reproduce the classic demonstration: a worker holds the lock for
/// five seconds and the fork is attempted one second after the worker has it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    // =========================================================================
    // Lock settings
    // =========================================================================
    /// Name of the shared lock, used in logs and the report.
    #[serde(default = "default_lock_name")]
    pub lock_name: String,

    /// Register the fork hooks. `false` runs the negative control, in which
    /// the child is expected to block.
    #[serde(default = "default_true")]
    pub guarded: bool,

    // =========================================================================
    // Scenario timing
    // =========================================================================
    /// Number of sequential worker-then-fork rounds sharing one registration.
    #[serde(default = "default_rounds")]
    pub rounds: u32,

    /// How long the worker holds the lock, in milliseconds.
    #[serde(default = "default_hold_ms")]
    pub hold_ms: u64,

    /// Extra pause between the worker's readiness signal and the fork.
    #[serde(default = "default_fork_delay_ms")]
    pub fork_delay_ms: u64,

    /// How long to wait for the worker to report that it holds the lock.
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,

    // =========================================================================
    // Child settings
    // =========================================================================
    /// Bounded wait for the child's own acquire of the lock.
    #[serde(default = "default_child_lock_timeout_ms")]
    pub child_lock_timeout_ms: u64,

    /// Bounded wait for the child process to exit before it is killed.
    #[serde(default = "default_child_exit_timeout_ms")]
    pub child_exit_timeout_ms: u64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            lock_name: default_lock_name(),
            guarded: true,
            rounds: default_rounds(),
            hold_ms: default_hold_ms(),
            fork_delay_ms: default_fork_delay_ms(),
            ready_timeout_ms: default_ready_timeout_ms(),
            child_lock_timeout_ms: default_child_lock_timeout_ms(),
            child_exit_timeout_ms: default_child_exit_timeout_ms(),
        }
    }
}

impl ScenarioConfig {
    pub fn hold(&self) -> Duration {
        Duration::from_millis(self.hold_ms)
    }

    pub fn fork_delay(&self) -> Duration {
        Duration::from_millis(self.fork_delay_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn child_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.child_lock_timeout_ms)
    }

    pub fn child_exit_timeout(&self) -> Duration {
        Duration::from_millis(self.child_exit_timeout_ms)
    }
}
