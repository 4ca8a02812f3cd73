//! Tests for the shared lock.

use super::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_acquire_and_release() {
    let lock = SharedLock::new("shared");

    lock.acquire().unwrap();
    assert!(lock.is_locked());
    assert!(lock.is_held_by_current_thread());
    assert_eq!(lock.holder(), Some(ThreadToken::current()));

    lock.release().unwrap();
    assert!(!lock.is_locked());
    assert_eq!(lock.holder(), None);
}

#[test]
fn test_reentrant_acquire_is_invalid_state() {
    let lock = SharedLock::new("shared");
    lock.acquire().unwrap();

    let err = lock.acquire().unwrap_err();
    assert!(matches!(err, LockError::InvalidState { .. }));

    let err = lock.try_acquire().unwrap_err();
    assert!(matches!(err, LockError::InvalidState { .. }));

    // Still held exactly once.
    lock.release().unwrap();
    assert!(!lock.is_locked());
}

#[test]
fn test_release_by_non_holder_is_not_owner() {
    let lock = Arc::new(SharedLock::new("shared"));
    let (held_tx, held_rx) = mpsc::channel();
    let (done_tx, done_rx) = mpsc::channel::<()>();

    let holder_lock = Arc::clone(&lock);
    let holder = thread::spawn(move || {
        holder_lock.acquire().unwrap();
        held_tx.send(ThreadToken::current()).unwrap();
        done_rx.recv().unwrap();
        holder_lock.release().unwrap();
    });

    let holder_token = held_rx.recv().unwrap();
    let err = lock.release().unwrap_err();
    match err {
        LockError::NotOwner { caller, holder, .. } => {
            assert_eq!(caller, ThreadToken::current());
            assert_eq!(holder, Some(holder_token));
        }
        other => panic!("expected NotOwner, got {other:?}"),
    }

    // The failed release left the holder unchanged.
    assert_eq!(lock.holder(), Some(holder_token));

    done_tx.send(()).unwrap();
    holder.join().unwrap();
    assert!(!lock.is_locked());
}

#[test]
fn test_release_of_free_lock_is_not_owner() {
    let lock = SharedLock::new("shared");
    let err = lock.release().unwrap_err();
    assert!(matches!(err, LockError::NotOwner { holder: None, .. }));
    assert!(err.to_string().contains("nobody"));
}

#[test]
fn test_try_acquire_never_blocks() {
    let lock = Arc::new(SharedLock::new("shared"));
    let (held_tx, held_rx) = mpsc::channel();
    let (done_tx, done_rx) = mpsc::channel::<()>();

    let holder_lock = Arc::clone(&lock);
    let holder = thread::spawn(move || {
        holder_lock.acquire().unwrap();
        held_tx.send(()).unwrap();
        done_rx.recv().unwrap();
        holder_lock.release().unwrap();
    });
    held_rx.recv().unwrap();

    let started = Instant::now();
    assert!(!lock.try_acquire().unwrap());
    assert!(started.elapsed() < Duration::from_millis(100));

    done_tx.send(()).unwrap();
    holder.join().unwrap();

    assert!(lock.try_acquire().unwrap());
    lock.release().unwrap();
}

#[test]
fn test_acquire_timeout_expires_while_held_elsewhere() {
    let lock = Arc::new(SharedLock::new("shared"));
    let (held_tx, held_rx) = mpsc::channel();
    let (done_tx, done_rx) = mpsc::channel::<()>();

    let holder_lock = Arc::clone(&lock);
    let holder = thread::spawn(move || {
        holder_lock.acquire().unwrap();
        held_tx.send(()).unwrap();
        done_rx.recv().unwrap();
        holder_lock.release().unwrap();
    });
    held_rx.recv().unwrap();

    let err = lock.acquire_timeout(Duration::from_millis(50)).unwrap_err();
    match err {
        LockError::Timeout { waited, .. } => assert!(waited >= Duration::from_millis(50)),
        other => panic!("expected Timeout, got {other:?}"),
    }

    done_tx.send(()).unwrap();
    holder.join().unwrap();
}

#[test]
fn test_acquire_blocks_until_holder_releases() {
    let lock = Arc::new(SharedLock::new("shared"));
    let (held_tx, held_rx) = mpsc::channel();

    let holder_lock = Arc::clone(&lock);
    let holder = thread::spawn(move || {
        holder_lock.acquire().unwrap();
        held_tx.send(()).unwrap();
        thread::sleep(Duration::from_millis(100));
        holder_lock.release().unwrap();
    });
    held_rx.recv().unwrap();

    let started = Instant::now();
    lock.acquire().unwrap();
    assert!(started.elapsed() >= Duration::from_millis(50));
    lock.release().unwrap();
    holder.join().unwrap();
}

#[test]
fn test_mutual_exclusion_under_contention() {
    let lock = Arc::new(SharedLock::new("shared"));
    let inside = Arc::new(AtomicUsize::new(0));
    let total = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let lock = Arc::clone(&lock);
            let inside = Arc::clone(&inside);
            let total = Arc::clone(&total);
            thread::spawn(move || {
                for _ in 0..200 {
                    let guard = lock.lock().unwrap();
                    assert_eq!(inside.fetch_add(1, Ordering::Relaxed), 0);
                    total.fetch_add(1, Ordering::Relaxed);
                    inside.fetch_sub(1, Ordering::Relaxed);
                    drop(guard);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(total.load(Ordering::Relaxed), 800);
    assert!(!lock.is_locked());
}

#[test]
fn test_guard_releases_on_drop() {
    let lock = SharedLock::new("shared");
    {
        let _guard = lock.lock().unwrap();
        assert!(lock.is_held_by_current_thread());
    }
    assert!(!lock.is_locked());
}

#[test]
fn test_guard_manual_release() {
    let lock = SharedLock::new("shared");
    let guard = lock.lock().unwrap();
    guard.release().unwrap();
    assert!(!lock.is_locked());
}

#[test]
fn test_snapshot_reflects_state() {
    let lock = SharedLock::new("shared");
    let free = lock.snapshot();
    assert!(!free.locked);
    assert_eq!(free.owner, None);
    assert_eq!(free.to_string(), "shared (unlocked)");

    lock.acquire().unwrap();
    let held = lock.snapshot();
    assert!(held.locked);
    assert_eq!(held.owner, Some(ThreadToken::current()));
    assert!(held.to_string().contains("locked by thread#"));
    lock.release().unwrap();
}
