//! Blocking waits over waitable handles.
//!
//! All waits are a single `poll(2)` over the handle list. When several
//! handles are signaled at once the lowest index wins, so a wait always
//! reports exactly one handle. Auto-reset handles are consumed by the wait
//! that reports them; if another thread consumed the signal first the wait
//! simply resumes.
//!
//! Failures of the underlying system calls are fatal.

use super::{RawHandle, Reset};
use crate::error::{FatalError, OrFatal, escalate, fatal};
use crate::sys;

use std::io;
use std::time::{Duration, Instant};

/// Maximum number of handles accepted by a single wait call.
pub const MAX_WAIT_HANDLES: usize = 64;

/// Blocks until `handle` is signaled.
pub fn wait(handle: RawHandle) {
    wait_any(&[handle]);
}

/// Blocks until `handle` is signaled or `timeout` elapses.
///
/// Returns `false` on timeout.
pub fn wait_timeout(handle: RawHandle, timeout: Duration) -> bool {
    wait_any_timeout(&[handle], timeout).is_some()
}

/// Blocks until one of `handles` is signaled and returns its index.
pub fn wait_any(handles: &[RawHandle]) -> usize {
    check_len(handles);

    match poll_any(handles, None).or_fatal("poll") {
        Some(index) => index,
        None => fatal!("infinite wait returned without a signaled handle"),
    }
}

/// Like [`wait_any`], but gives up after `timeout` and returns `None`.
pub fn wait_any_timeout(handles: &[RawHandle], timeout: Duration) -> Option<usize> {
    check_len(handles);

    poll_any(handles, Some(Instant::now() + timeout)).or_fatal("poll")
}

/// Blocks until every handle in `handles` has been signaled.
///
/// Handles are observed one at a time, so auto-reset handles are consumed
/// as they are seen rather than atomically.
pub fn wait_all(handles: &[RawHandle]) {
    check_len(handles);

    poll_all(handles, None).or_fatal("poll");
}

/// Like [`wait_all`], but gives up after `timeout` and returns `false`.
pub fn wait_all_timeout(handles: &[RawHandle], timeout: Duration) -> bool {
    check_len(handles);

    poll_all(handles, Some(Instant::now() + timeout)).or_fatal("poll")
}

/// Returns `true` if `handle` is currently signaled, without consuming it.
pub fn is_signaled(handle: RawHandle) -> bool {
    let mut entry = [sys::poll_entry(handle.fd())];

    loop {
        match sys::sys_poll(&mut entry, Some(Duration::ZERO)) {
            Ok(_) if sys::is_invalid(&entry[0]) => {
                fatal!("poll on closed handle {}", handle.fd())
            }
            Ok(_) => return entry[0].revents & sys::READY != 0,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(source) => escalate(FatalError::Os { op: "poll", source }),
        }
    }
}

fn check_len(handles: &[RawHandle]) {
    if handles.is_empty() {
        fatal!("wait on an empty handle list");
    }

    if handles.len() > MAX_WAIT_HANDLES {
        fatal!(
            "wait on {} handles exceeds the limit of {MAX_WAIT_HANDLES}",
            handles.len()
        );
    }
}

fn poll_any(handles: &[RawHandle], deadline: Option<Instant>) -> io::Result<Option<usize>> {
    let mut entries: Vec<_> = handles.iter().map(|h| sys::poll_entry(h.fd())).collect();

    loop {
        let timeout = deadline.map(|d| d.saturating_duration_since(Instant::now()));

        for entry in &mut entries {
            entry.revents = 0;
        }

        match sys::sys_poll(&mut entries, timeout) {
            Ok(0) if deadline.is_some() => return Ok(None),
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }

        for (index, entry) in entries.iter().enumerate() {
            if sys::is_invalid(entry) {
                return Err(io::Error::from_raw_os_error(libc::EBADF));
            }

            if entry.revents & sys::READY == 0 {
                continue;
            }

            match handles[index].reset() {
                Reset::Manual => return Ok(Some(index)),
                Reset::Auto => {
                    if sys::sys_counter_drain(entry.fd)? {
                        return Ok(Some(index));
                    }
                }
            }
        }

        // Every ready handle was auto-reset and consumed elsewhere.
    }
}

fn poll_all(handles: &[RawHandle], deadline: Option<Instant>) -> io::Result<bool> {
    let mut pending = handles.to_vec();

    while !pending.is_empty() {
        match poll_any(&pending, deadline)? {
            Some(index) => {
                pending.swap_remove(index);
            }
            None => return Ok(false),
        }
    }

    Ok(true)
}
