//! Scenario results.

use crate::error::{GuardError, Result};
use crate::exit_codes;
use crate::fork::ChildStatus;
use crate::lock::LockSnapshot;
use crate::worker::duration_ms;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Outcome of one worker-then-fork round, as seen by the parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundReport {
    /// 1-based round number.
    pub round: u32,

    /// Pid of the forked child.
    pub child_pid: i32,

    /// Lock state just before the fork was requested.
    pub lock_before_fork: LockSnapshot,

    /// Time the pre-fork hooks spent waiting for the lock.
    #[serde(rename = "prepare_wait_ms", with = "duration_ms")]
    pub prepare_wait: Duration,

    /// Whether the parent could take the lock immediately after the fork.
    pub parent_lock_free: bool,

    /// How the child ended.
    pub child: ChildStatus,

    /// How long the worker held the lock.
    #[serde(rename = "worker_held_ms", with = "duration_ms")]
    pub worker_held_for: Duration,
}

impl RoundReport {
    /// Exit code this round maps to.
    pub fn exit_code(&self) -> i32 {
        match &self.child {
            ChildStatus::Exited { code } => *code,
            ChildStatus::TimedOut { .. } => exit_codes::LOCK_HAZARD,
            ChildStatus::Signaled { .. } => exit_codes::INTERNAL_FAILURE,
        }
    }

    /// Whether the child blocked on the lock past its bounded wait.
    pub fn hazard_observed(&self) -> bool {
        self.exit_code() == exit_codes::LOCK_HAZARD
    }
}

impl std::fmt::Display for RoundReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "round {}: child {} {}; parent lock {}; fork waited {}ms for the lock",
            self.round,
            self.child_pid,
            self.child,
            if self.parent_lock_free { "free" } else { "busy" },
            self.prepare_wait.as_millis()
        )
    }
}

/// Results of a whole scenario run.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    /// Host the scenario ran on.
    pub host: String,

    /// Pid of the original process.
    pub pid: u32,

    /// Whether the fork hooks were registered.
    pub guarded: bool,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub rounds: Vec<RoundReport>,
}

impl ScenarioReport {
    /// First non-zero round exit code, or success.
    pub fn exit_code(&self) -> i32 {
        self.rounds
            .iter()
            .map(RoundReport::exit_code)
            .find(|&code| code != exit_codes::SUCCESS)
            .unwrap_or(exit_codes::SUCCESS)
    }

    pub fn hazard_observed(&self) -> bool {
        self.rounds.iter().any(RoundReport::hazard_observed)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| GuardError::UserError(format!("failed to serialize report: {}", e)))
    }
}

/// Name of this host, or `unknown`.
pub(crate) fn host_name() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}
