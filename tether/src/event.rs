//! Kernel events.

use crate::error::OrFatal;
use crate::handle::wait;
use crate::handle::{OwnedHandle, RawHandle, Reset};
use crate::sys;

use std::os::fd::AsRawFd;
use std::time::Duration;

/// A signalable kernel event backed by an `eventfd`.
///
/// An `Event` is either unsignaled or signaled. [`set`](Self::set) signals
/// it, [`reset`](Self::reset) clears it, and [`join`](Self::join) blocks
/// until it is signaled. Whether observing the signal clears it is decided
/// by the [`Reset`] policy chosen at construction:
///
/// - [`Event::new`] creates an auto-reset event: the wait that observes the
///   signal consumes it, so each `set` releases exactly one waiter.
/// - [`Event::manual`] creates a manual-reset event: once set, every wait
///   returns immediately until [`reset`](Self::reset) is called.
///
/// The raw [`handle`](Self::handle) can be folded into a multi-handle wait
/// or registered with a [`WaitMultiplexer`](crate::looper::WaitMultiplexer).
///
/// Failing to create, signal or wait on the underlying descriptor is fatal.
#[derive(Debug)]
pub struct Event {
    handle: OwnedHandle,
}

impl Event {
    /// Creates an unsignaled auto-reset event.
    pub fn new() -> Self {
        Self::with_reset(Reset::Auto)
    }

    /// Creates an unsignaled manual-reset event.
    pub fn manual() -> Self {
        Self::with_reset(Reset::Manual)
    }

    fn with_reset(reset: Reset) -> Self {
        let fd = sys::sys_eventfd().or_fatal("eventfd");

        Self {
            handle: OwnedHandle::new(fd, reset),
        }
    }

    /// Signals the event. Setting a signaled event has no effect.
    pub fn set(&self) {
        sys::sys_counter_signal(self.handle.as_raw_fd()).or_fatal("eventfd write");
    }

    /// Clears the event.
    pub fn reset(&self) {
        sys::sys_counter_drain(self.handle.as_raw_fd()).or_fatal("eventfd read");
    }

    /// Blocks until the event is signaled.
    pub fn join(&self) {
        wait::wait(self.handle());
    }

    /// Blocks until the event is signaled or `timeout` elapses.
    ///
    /// Returns `false` on timeout.
    pub fn join_timeout(&self, timeout: Duration) -> bool {
        wait::wait_timeout(self.handle(), timeout)
    }

    /// Returns `true` if the event is signaled. Never consumes the signal.
    pub fn is_signaled(&self) -> bool {
        wait::is_signaled(self.handle())
    }

    /// Returns the waitable handle of this event.
    pub fn handle(&self) -> RawHandle {
        self.handle.raw()
    }
}

impl Default for Event {
    /// Creates an unsignaled auto-reset event.
    fn default() -> Self {
        Self::new()
    }
}
