//! The worker thread that holds the shared lock across a fork.
//!
//! The worker takes the lock, announces that it holds it, keeps it for a fixed
//! interval and releases it. The orchestrator waits on the announcement so
//! that the lock is known to be held by another thread when it forks.
//!
//! The worker emits nothing after it releases the lock. A fork that follows
//! the release (as a guarded fork does) therefore never copies a log write
//! that is still in progress on the worker thread.

use crate::error::{GuardError, Result};
use crate::lock::SharedLock;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Worker lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum WorkerState {
    NotStarted = 0,
    RunningHoldingLock = 1,
    SleepingHoldingLock = 2,
    Finished = 3,
}

impl WorkerState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => WorkerState::RunningHoldingLock,
            2 => WorkerState::SleepingHoldingLock,
            3 => WorkerState::Finished,
            _ => WorkerState::NotStarted,
        }
    }

    /// Whether the worker holds the lock in this state.
    pub fn holds_lock(&self) -> bool {
        matches!(
            self,
            WorkerState::RunningHoldingLock | WorkerState::SleepingHoldingLock
        )
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerState::NotStarted => write!(f, "not started"),
            WorkerState::RunningHoldingLock => write!(f, "running, holding lock"),
            WorkerState::SleepingHoldingLock => write!(f, "sleeping, holding lock"),
            WorkerState::Finished => write!(f, "finished"),
        }
    }
}

/// What the worker did, returned by [`Worker::join`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkerReport {
    /// How long the lock was held.
    #[serde(with = "duration_ms")]
    pub held_for: Duration,
}

/// Handle to a running worker thread.
#[derive(Debug)]
pub struct Worker {
    handle: JoinHandle<Result<WorkerReport>>,
    state: Arc<AtomicU8>,
    ready: Receiver<()>,
}

impl Worker {
    /// Start a worker that holds `lock` for `hold`.
    pub fn spawn(lock: Arc<SharedLock>, hold: Duration) -> Result<Self> {
        let state = Arc::new(AtomicU8::new(WorkerState::NotStarted as u8));
        let (ready_tx, ready) = mpsc::sync_channel(1);

        let thread_state = Arc::clone(&state);
        let handle = thread::Builder::new()
            .name("worker".to_string())
            .spawn(move || -> Result<WorkerReport> {
                let guard = lock.lock()?;
                let acquired_at = Instant::now();
                thread_state.store(WorkerState::RunningHoldingLock as u8, Ordering::Release);
                tracing::info!(lock = lock.name(), "worker holds the lock");

                thread_state.store(WorkerState::SleepingHoldingLock as u8, Ordering::Release);
                tracing::info!(?hold, "worker sleeping with the lock held");
                // Signal only once logging is done, so a fork right after this
                // point cannot copy a half-written log line.
                // The orchestrator may already have stopped waiting.
                ready_tx.send(()).ok();
                thread::sleep(hold);

                tracing::info!(lock = lock.name(), "worker releasing the lock");
                let held_for = acquired_at.elapsed();
                guard.release()?;
                thread_state.store(WorkerState::Finished as u8, Ordering::Release);
                Ok(WorkerReport { held_for })
            })
            .map_err(|e| GuardError::WorkerError(format!("failed to spawn worker: {}", e)))?;

        Ok(Self {
            handle,
            state,
            ready,
        })
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Block until the worker holds the lock, or `timeout` elapses.
    pub fn wait_until_holding(&self, timeout: Duration) -> Result<()> {
        match self.ready.recv_timeout(timeout) {
            Ok(()) => Ok(()),
            Err(RecvTimeoutError::Timeout) => Err(GuardError::WorkerError(format!(
                "worker did not take the lock within {:?} (state: {})",
                timeout,
                self.state()
            ))),
            Err(RecvTimeoutError::Disconnected) => Err(GuardError::WorkerError(
                "worker exited before taking the lock".to_string(),
            )),
        }
    }

    /// Wait for the worker to finish.
    pub fn join(self) -> Result<WorkerReport> {
        self.handle
            .join()
            .map_err(|_| GuardError::WorkerError("worker thread panicked".to_string()))?
    }
}

pub(crate) mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }
}
