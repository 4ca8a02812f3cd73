//! End-to-end fork scenario.
//!
//! Each round starts a [`Worker`] that holds the shared lock, waits for its
//! readiness signal, forks through a [`Duplicator`] and checks the lock on
//! both sides:
//!
//! - the child tries the lock at once, falls back to a bounded acquire, and
//!   exits with a code describing what happened;
//! - the parent tries the lock right after the fork, waits (bounded) for the
//!   child and joins the worker.
//!
//! With the fork hooks registered the child always finds the lock free.
//! Without them the child inherits a lock held by the worker, which does not
//! exist in the child, and its acquire times out.

mod report;


pub use report::{RoundReport, ScenarioReport};

use crate::config::ScenarioConfig;
use crate::error::Result;
use crate::exit_codes;
use crate::fork::{Duplication, Duplicator, HookRegistry, exit_child, wait_for_child};
use crate::lock::{LockError, SharedLock};
use crate::worker::Worker;
use chrono::Utc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Drives the scenario described by a [`ScenarioConfig`].
#[derive(Debug)]
pub struct ProcessOrchestrator {
    config: ScenarioConfig,
    lock: Arc<SharedLock>,
}

impl ProcessOrchestrator {
    /// Validate `config` and create the shared lock.
    pub fn new(config: ScenarioConfig) -> Result<Self> {
        config.validate()?;
        let lock = Arc::new(SharedLock::new(config.lock_name.clone()));
        Ok(Self { config, lock })
    }

    #[cfg(test)]
    pub fn lock(&self) -> &Arc<SharedLock> {
        &self.lock
    }

    /// Hooks for this scenario: a guard on the shared lock, or nothing for
    /// the unguarded negative control.
    pub fn hook_registry(&self) -> Result<HookRegistry> {
        let mut registry = HookRegistry::new();
        if self.config.guarded {
            registry.guard_lock(&self.lock)?;
        } else {
            tracing::warn!(
                lock = self.lock.name(),
                "fork hooks not registered; the child is expected to block"
            );
        }
        Ok(registry)
    }

    /// Run every round through `duplicator`.
    ///
    /// Only the original process returns. Forked children exit inside this
    /// call with an exit code from [`exit_codes`].
    pub fn run(&self, duplicator: &Duplicator<'_>) -> Result<ScenarioReport> {
        let started_at = Utc::now();
        let mut rounds = Vec::new();

        for round in 1..=self.config.rounds {
            let report = self.run_round(round, duplicator)?;
            if report.exit_code() == exit_codes::SUCCESS {
                tracing::info!(%report, "round complete");
            } else {
                tracing::warn!(%report, "round complete, child did not get the lock");
            }
            rounds.push(report);
        }

        Ok(ScenarioReport {
            host: report::host_name(),
            pid: std::process::id(),
            guarded: self.config.guarded,
            started_at,
            finished_at: Utc::now(),
            rounds,
        })
    }

    fn run_round(&self, round: u32, duplicator: &Duplicator<'_>) -> Result<RoundReport> {
        let worker = Worker::spawn(Arc::clone(&self.lock), self.config.hold())?;
        worker.wait_until_holding(self.config.ready_timeout())?;
        if !worker.state().holds_lock() {
            tracing::warn!(state = %worker.state(), "worker signalled readiness without the lock");
        }

        let delay = self.config.fork_delay();
        if !delay.is_zero() {
            tracing::debug!(?delay, "pausing before fork");
            thread::sleep(delay);
        }

        let lock_before_fork = self.lock.snapshot();
        tracing::info!(round, lock = %lock_before_fork, worker = %worker.state(), "forking");

        let duplication = match duplicator.duplicate() {
            Ok(duplication) => duplication,
            Err(e) => {
                // Let the worker finish so its lock is not left behind.
                if let Err(join_err) = worker.join() {
                    tracing::warn!(error = %join_err, "worker failed after duplication failure");
                }
                return Err(e);
            }
        };

        match duplication {
            Duplication::Child => exit_child(probe_child(&self.lock, self.config.child_lock_timeout())),
            Duplication::Parent {
                child,
                prepare_wait,
            } => {
                let parent_lock_free = probe_parent(&self.lock)?;
                let child_status = wait_for_child(child, self.config.child_exit_timeout())?;
                let worker_report = worker.join()?;

                Ok(RoundReport {
                    round,
                    child_pid: child.as_raw(),
                    lock_before_fork,
                    prepare_wait,
                    parent_lock_free,
                    child: child_status,
                    worker_held_for: worker_report.held_for,
                })
            }
        }
    }
}

/// Check the lock in the original process right after a fork.
///
/// Returns whether it was free. If it was, it is released again at once.
fn probe_parent(lock: &SharedLock) -> Result<bool> {
    let free = lock.try_acquire()?;
    if free {
        lock.release()?;
    } else {
        tracing::debug!(lock = %lock.snapshot(), "lock busy in parent after fork");
    }
    Ok(free)
}

/// Check the lock in a forked child and return the child's exit code.
pub(crate) fn probe_child(lock: &SharedLock, timeout: Duration) -> i32 {
    tracing::info!(pid = std::process::id(), "child started, taking the lock");
    let started = Instant::now();

    let result = match lock.try_acquire() {
        Ok(true) => Ok(()),
        Ok(false) => lock.acquire_timeout(timeout),
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            let waited = started.elapsed();
            if let Err(e) = lock.release() {
                tracing::error!(error = %e, "child could not release the lock");
                return exit_codes::LOCK_MISUSE;
            }
            tracing::info!(?waited, "child took and released the lock");
            exit_codes::SUCCESS
        }
        Err(e @ LockError::Timeout { .. }) => {
            tracing::warn!(
                error = %e,
                lock = %lock.snapshot(),
                "child is blocked by a holder that does not exist in this process"
            );
            exit_codes::LOCK_HAZARD
        }
        Err(e) => {
            tracing::error!(error = %e, "child misused the lock");
            exit_codes::LOCK_MISUSE
        }
    }
}
