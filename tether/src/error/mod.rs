//! Error tiers.
//!
//! Two kinds of failure exist in this crate:
//!
//! - [`FatalError`]: a broken environment or a violated invariant (an OS
//!   primitive refused to be created, signaled or waited on, a source was
//!   registered twice, a thread exited without being canceled). These are
//!   never returned; they are logged and escalated through [`escalate`]
//!   according to the process-wide [`FatalAction`].
//! - [`Error`]: conditions a caller can act on, such as a process that no
//!   longer exists when it is opened.

mod macros;

pub(crate) use macros::fatal;

use std::io;
use std::panic::{self, Location};
use std::sync::atomic::{AtomicU8, Ordering};

const ABORT: u8 = 0;
const UNWIND: u8 = 1;

static ACTION: AtomicU8 = AtomicU8::new(ABORT);

/// An unrecoverable failure.
#[derive(Debug, thiserror::Error)]
pub enum FatalError {
    /// A system call backing a kernel object failed.
    #[error("{op} failed: {source}")]
    Os {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    /// A usage or bookkeeping invariant was broken.
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// A thread configured to crash on unexpected exit returned without
    /// having been canceled.
    #[error("thread `{thread}` terminated unexpectedly")]
    UnexpectedExit { thread: String },
}

/// Recoverable errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The process could not be opened (it may already be gone).
    #[error("failed to open process {pid}")]
    OpenProcess {
        pid: u32,
        #[source]
        source: io::Error,
    },

    /// The exit status of a process could not be queried.
    #[error("failed to query exit status of process {pid}")]
    ExitStatus {
        pid: u32,
        #[source]
        source: io::Error,
    },
}

/// Result alias for recoverable operations.
pub type Result<T> = std::result::Result<T, Error>;

/// What happens after a [`FatalError`] has been logged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FatalAction {
    /// Terminate the process immediately. This is the default.
    Abort,

    /// Unwind the current thread with the [`FatalError`] as panic payload.
    ///
    /// Managed threads keep the payload and expose it through
    /// [`ManagedThread::take_fatal_error`](crate::thread::ManagedThread::take_fatal_error).
    Unwind,
}

/// Sets the process-wide reaction to fatal errors.
pub fn set_fatal_action(action: FatalAction) {
    let raw = match action {
        FatalAction::Abort => ABORT,
        FatalAction::Unwind => UNWIND,
    };
    ACTION.store(raw, Ordering::Release);
}

/// Returns the current process-wide reaction to fatal errors.
pub fn fatal_action() -> FatalAction {
    match ACTION.load(Ordering::Acquire) {
        UNWIND => FatalAction::Unwind,
        _ => FatalAction::Abort,
    }
}

/// Logs `error` with the caller's location and escalates it.
#[cold]
#[track_caller]
pub fn escalate(error: FatalError) -> ! {
    let location = Location::caller();

    tracing::error!(
        file = location.file(),
        line = location.line(),
        error = %error,
        "fatal error"
    );

    match fatal_action() {
        FatalAction::Abort => std::process::abort(),
        FatalAction::Unwind => panic::panic_any(error),
    }
}

/// Escalates failed system calls.
pub(crate) trait OrFatal<T> {
    /// Unwraps the value or escalates a [`FatalError::Os`] naming `op`.
    fn or_fatal(self, op: &'static str) -> T;
}

impl<T> OrFatal<T> for io::Result<T> {
    #[track_caller]
    fn or_fatal(self, op: &'static str) -> T {
        match self {
            Ok(value) => value,
            Err(source) => escalate(FatalError::Os { op, source }),
        }
    }
}
