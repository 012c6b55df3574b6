//! # Tether
//!
//! **Tether** is the thread and process lifecycle layer of the **Nebula**
//! ecosystem. It runs units of work on managed OS threads, watches child
//! processes, and multiplexes many waitable kernel objects into a single
//! blocking wait.
//!
//! Everything waitable in Tether is a file descriptor (an `eventfd`, a
//! `timerfd` or a `pidfd`) wrapped in a [`RawHandle`], so threads, events,
//! timers and processes can all be waited on together:
//!
//! - [`Event`] — auto- or manual-reset signaling
//! - [`Timer`] — one-shot or periodic waitable timer
//! - [`ManagedThread`] / [`WorkerWrapper`] — a [`Runnable`] on its own thread,
//!   with captured errors, cancellation and unexpected-exit detection
//! - [`ProcessSet`] — a set of child processes reporting exits
//! - [`WaitMultiplexer`] — one wait loop over handles from many sources
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use tether::{JobError, ManagedThread, Runnable};
//!
//! struct Spin(AtomicBool);
//!
//! impl Runnable for Spin {
//!     fn run(&self) -> Result<i32, JobError> {
//!         while !self.0.load(Ordering::Acquire) {
//!             std::thread::yield_now();
//!         }
//!         Ok(0)
//!     }
//!
//!     fn request_cancel(&self) -> bool {
//!         self.0.store(true, Ordering::Release);
//!         true
//!     }
//! }
//!
//! let thread = ManagedThread::spawn(Arc::new(Spin(AtomicBool::new(false))));
//! thread.cancel();
//! thread.join();
//! assert_eq!(thread.return_code(), 0);
//! ```
//!
//! ## Failures
//!
//! Recoverable failures are returned as [`Error`]. Broken invariants and
//! failing kernel calls are fatal: they go through [`error::escalate`],
//! which aborts the process by default (see [`FatalAction`]).
//!
//! Tether targets Linux 5.4 or newer.

mod sys;

pub mod error;
pub mod event;
pub mod handle;
pub mod looper;
pub mod process;
pub mod thread;
pub mod timer;

pub use error::{Error, FatalAction, FatalError, Result, set_fatal_action};
pub use event::Event;
pub use handle::{RawHandle, Reset};
pub use looper::{Canceller, WaitMultiplexer, WaitSource};
pub use process::{ProcessExit, ProcessHandle, ProcessSet};
pub use thread::{JobError, ManagedThread, Runnable, ThreadBuilder, WorkerWrapper};
pub use timer::{Timer, TimerState};
