//! Process handles and process exit fan-in.
//!
//! This crate never spawns processes. Callers spawn them however they
//! like and hand a [`ProcessHandle`] to a [`ProcessSet`], which reports
//! exits through a queue and an [`Event`](crate::event::Event).

mod set;

pub use set::ProcessSet;

use crate::error::{Error, Result};
use crate::handle::wait;
use crate::handle::{OwnedHandle, RawHandle, Reset};
use crate::sys::{self, ChildStatus};

use std::os::fd::AsRawFd;
use std::process::Child;

/// How a process ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessExit {
    /// The process exited with this status code.
    Code(i32),

    /// The process was killed by this signal.
    Signal(i32),
}

/// A waitable handle to a process, backed by a pidfd.
///
/// The handle becomes signaled (and stays signaled) when the process
/// terminates. Dropping it closes the pidfd; the process itself is not
/// affected.
#[derive(Debug)]
pub struct ProcessHandle {
    handle: OwnedHandle,
    pid: u32,
}

impl ProcessHandle {
    /// Opens a handle to the running process `pid`.
    pub fn open(pid: u32) -> Result<Self> {
        let fd = sys::sys_pidfd_open(pid as libc::pid_t)
            .map_err(|source| Error::OpenProcess { pid, source })?;

        Ok(Self {
            handle: OwnedHandle::new(fd, Reset::Manual),
            pid,
        })
    }

    /// Opens a handle to a child spawned with [`std::process::Command`].
    ///
    /// The child must not have been reaped yet.
    pub fn from_child(child: &Child) -> Result<Self> {
        Self::open(child.id())
    }

    /// Returns the process id.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Returns `true` while the process has not terminated.
    pub fn is_active(&self) -> bool {
        !wait::is_signaled(self.handle())
    }

    /// Returns how the process ended, or `None` while it is running.
    ///
    /// Only children of the calling process can be queried. The child is
    /// not reaped, so its owner can still wait on it.
    pub fn exit_status(&self) -> Result<Option<ProcessExit>> {
        let status = sys::sys_pidfd_status(self.handle.as_raw_fd()).map_err(|source| {
            Error::ExitStatus {
                pid: self.pid,
                source,
            }
        })?;

        Ok(match status {
            ChildStatus::Running => None,
            ChildStatus::Exited(code) => Some(ProcessExit::Code(code)),
            ChildStatus::Signaled(signal) => Some(ProcessExit::Signal(signal)),
        })
    }

    /// Returns the waitable handle of this process.
    pub fn handle(&self) -> RawHandle {
        self.handle.raw()
    }
}
