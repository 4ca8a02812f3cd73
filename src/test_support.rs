use crate::fork::exit_child;
use crate::lock::SharedLock;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Exit code a forked test child uses when its body panicked.
pub(crate) const CHILD_PANICKED: i32 = 101;

/// Run `body` in a forked child and exit with the code it returns.
///
/// The child must not return into the test harness, which lives on in the
/// parent. Keep `body` free of printing: stdout capture belongs to threads
/// that do not exist in the child.
pub(crate) fn run_child(body: impl FnOnce() -> i32) -> ! {
    let code = panic::catch_unwind(AssertUnwindSafe(body)).unwrap_or(CHILD_PANICKED);
    exit_child(code)
}

/// A thread holding `lock` for `hold`.
pub(crate) struct Holder {
    handle: JoinHandle<()>,
}

impl Holder {
    /// Spawn the holder and return once it holds the lock.
    pub(crate) fn start(lock: &Arc<SharedLock>, hold: Duration) -> Self {
        let (held_tx, held_rx) = mpsc::channel();
        let lock = Arc::clone(lock);
        let handle = thread::spawn(move || {
            lock.acquire().unwrap();
            held_tx.send(()).unwrap();
            thread::sleep(hold);
            lock.release().unwrap();
        });
        held_rx.recv().unwrap();
        Self { handle }
    }

    pub(crate) fn join(self) {
        self.handle.join().unwrap();
    }
}
