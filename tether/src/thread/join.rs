//! Waiting on several managed threads at once.
//!
//! These helpers wait on the completion handles of a fixed slice of
//! threads. They only wait: joining (and releasing) each thread is still
//! done through [`ManagedThread::join`].
//!
//! The slice must be non-empty and hold at most
//! [`MAX_WAIT_HANDLES`](crate::handle::wait::MAX_WAIT_HANDLES) threads;
//! callers with more threads wait in batches. Violations are fatal.

use super::ManagedThread;
use crate::handle::RawHandle;
use crate::handle::wait;

use std::time::Duration;

/// Blocks until one of `threads` has finished and returns its index.
///
/// If several have finished, the lowest index is returned.
pub fn join_any<T: AsRef<ManagedThread>>(threads: &[T]) -> usize {
    wait::wait_any(&handles(threads))
}

/// Like [`join_any`], but returns `None` once `timeout` elapses.
pub fn join_any_timeout<T: AsRef<ManagedThread>>(threads: &[T], timeout: Duration) -> Option<usize> {
    wait::wait_any_timeout(&handles(threads), timeout)
}

/// Blocks until every thread in `threads` has finished.
pub fn join_all<T: AsRef<ManagedThread>>(threads: &[T]) {
    wait::wait_all(&handles(threads));
}

/// Like [`join_all`], but returns `false` once `timeout` elapses.
pub fn join_all_timeout<T: AsRef<ManagedThread>>(threads: &[T], timeout: Duration) -> bool {
    wait::wait_all_timeout(&handles(threads), timeout)
}

fn handles<T: AsRef<ManagedThread>>(threads: &[T]) -> Vec<RawHandle> {
    threads.iter().map(|t| t.as_ref().handle()).collect()
}
