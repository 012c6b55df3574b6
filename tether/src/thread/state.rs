/// Thread object exists; the body has not started yet (it may be held at
/// the start gate).
pub(crate) const CREATED: u8 = 0;

/// The body passed the start gate and is executing.
pub(crate) const RUNNING: u8 = 1;

/// The body ended normally or after a cancel request.
pub(crate) const COMPLETED: u8 = 2;

/// The body ended without a cancel request on a thread that watches for
/// unexpected exits, or unwound with a fatal error.
pub(crate) const CRASHED: u8 = 3;

/// The OS thread has been joined and released.
pub(crate) const JOINED: u8 = 4;

/// Lifecycle of a [`ManagedThread`](super::ManagedThread).
///
/// `Created -> Running -> {Completed | CrashedUnexpectedly} -> Joined`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThreadState {
    Created,
    Running,
    Completed,
    CrashedUnexpectedly,
    Joined,
}

impl ThreadState {
    pub(crate) fn from_raw(raw: u8) -> Self {
        match raw {
            CREATED => Self::Created,
            RUNNING => Self::Running,
            COMPLETED => Self::Completed,
            CRASHED => Self::CrashedUnexpectedly,
            _ => Self::Joined,
        }
    }
}
