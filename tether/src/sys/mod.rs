//! Platform system-call layer.
//!
//! Every kernel object used by the crate (events, timers, process
//! handles) is a file descriptor on Linux, and every multi-object wait
//! is a single `poll(2)` call. This module keeps the raw `libc` calls in
//! one place; the rest of the crate only sees `io::Result` values.

#[cfg(target_os = "linux")]
mod unix;

#[cfg(target_os = "linux")]
pub(crate) use unix::*;
