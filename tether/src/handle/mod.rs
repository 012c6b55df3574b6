//! Waitable kernel handles.
//!
//! A waitable handle is a file descriptor that becomes readable when the
//! object it refers to is signaled: an `eventfd` with a non-zero counter, a
//! `timerfd` that expired, a pidfd whose process exited.
//!
//! Ownership is split in two:
//!
//! - [`OwnedHandle`] owns the descriptor and closes it exactly once on drop.
//!   It is move-only.
//! - [`RawHandle`] is a `Copy` token naming a descriptor plus its [`Reset`]
//!   policy. Wait lists are built from tokens; the owner must outlive every
//!   wait that uses them.

pub mod wait;

use std::os::fd::{AsRawFd, OwnedFd, RawFd};

/// How a successful wait affects a handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Reset {
    /// The wait that observes the signal consumes it.
    Auto,

    /// The handle stays signaled until explicitly reset (or forever, for
    /// process and thread completion handles).
    Manual,
}

/// A non-owning token for a waitable handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RawHandle {
    fd: RawFd,
    reset: Reset,
}

impl RawHandle {
    /// A placeholder slot that never becomes signaled.
    pub const INVALID: RawHandle = RawHandle {
        fd: -1,
        reset: Reset::Manual,
    };

    /// Wraps a descriptor the caller keeps alive.
    pub const fn new(fd: RawFd, reset: Reset) -> Self {
        Self { fd, reset }
    }

    /// Returns the underlying descriptor.
    pub const fn fd(&self) -> RawFd {
        self.fd
    }

    /// Returns the reset policy.
    pub const fn reset(&self) -> Reset {
        self.reset
    }

    /// Returns `true` for [`RawHandle::INVALID`] and other negative
    /// descriptors.
    pub const fn is_invalid(&self) -> bool {
        self.fd < 0
    }
}

/// An owned waitable handle.
#[derive(Debug)]
pub struct OwnedHandle {
    fd: OwnedFd,
    reset: Reset,
}

impl OwnedHandle {
    pub(crate) fn new(fd: OwnedFd, reset: Reset) -> Self {
        Self { fd, reset }
    }

    /// Returns a token for use in wait lists.
    pub fn raw(&self) -> RawHandle {
        RawHandle::new(self.fd.as_raw_fd(), self.reset)
    }
}

impl AsRawFd for OwnedHandle {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}
