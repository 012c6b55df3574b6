//! Managed worker threads.
//!
//! A [`Runnable`] is a unit of work with a run-to-completion entry point
//! and a cooperative cancel request. A [`ManagedThread`] runs one Runnable
//! on a dedicated OS thread and keeps track of:
//!
//! - completion, exposed as a waitable [`handle`](ManagedThread::handle),
//! - the return code, or the error/panic the Runnable ended with,
//! - whether the thread ended without having been canceled (an
//!   "unexpected exit"), which can be escalated as a fatal error or
//!   reported through a crash event.
//!
//! [`WorkerWrapper`] bundles a Runnable with its thread so both share one
//! lifetime, [`ThreadBuilder`] configures either, and the functions in
//! [`join`] wait on several threads at once.

mod builder;
mod context;
mod managed;
mod state;
mod worker;

pub mod join;

pub use builder::ThreadBuilder;
pub use context::{cancel_requested, checkpoint};
pub use managed::{EXCEPTION_RETURN_CODE, ManagedThread};
pub use state::ThreadState;
pub use worker::WorkerWrapper;

use std::any::{self, Any};
use std::fmt::{self, Debug, Display, Formatter};

/// A unit of work run by a [`ManagedThread`].
///
/// `run` and `request_cancel` may be called concurrently from different
/// threads, so implementations keep their mutable state behind atomics or
/// locks.
pub trait Runnable: Send + Sync + 'static {
    /// Runs the work to completion and returns its exit code.
    fn run(&self) -> Result<i32, JobError>;

    /// Asks the work to stop.
    ///
    /// Returns `true` if the request was posted, `false` if this Runnable
    /// cannot be canceled. Cancellation is advisory: the Runnable decides
    /// when (and whether) `run` returns.
    fn request_cancel(&self) -> bool;
}

/// The error a [`Runnable`] ended with.
///
/// Any [`std::error::Error`] converts into a `JobError` through `?`; the
/// concrete type name is kept as the exception's type tag.
pub struct JobError {
    type_name: &'static str,
    message: String,
}

impl JobError {
    /// Creates an error from a plain message.
    pub fn msg<M: Display>(message: M) -> Self {
        Self {
            type_name: any::type_name::<Self>(),
            message: message.to_string(),
        }
    }

    /// Returns the type name of the original error.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl<E> From<E> for JobError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Self {
            type_name: any::type_name::<E>(),
            message: error.to_string(),
        }
    }
}

impl Debug for JobError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.type_name, self.message)
    }
}

impl Display for JobError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// An error or panic caught inside a managed thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturedException {
    type_name: String,
    message: String,
}

impl CapturedException {
    /// Type tag recorded for panics.
    pub const PANIC: &'static str = "panic";

    pub(crate) fn from_error(error: JobError) -> Self {
        Self {
            type_name: error.type_name.to_owned(),
            message: error.message,
        }
    }

    pub(crate) fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&'static str>() {
            (*message).to_owned()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            String::from("non-string panic payload")
        };

        Self {
            type_name: Self::PANIC.to_owned(),
            message,
        }
    }

    /// Returns the type tag: the error's type name, or [`Self::PANIC`].
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the message.
    pub fn message(&self) -> &str {
        &self.message
    }
}
