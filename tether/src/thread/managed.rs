use super::builder::ThreadBuilder;
use super::context::enter_context;
use super::state::{COMPLETED, CRASHED, CREATED, JOINED, RUNNING, ThreadState};
use super::{CapturedException, Runnable};
use crate::error::{FatalError, OrFatal, escalate};
use crate::event::Event;
use crate::handle::RawHandle;

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Return code recorded when the Runnable ends with an error or a panic.
pub const EXCEPTION_RETURN_CODE: i32 = -1;

/// Start gate of a managed thread.
///
/// The body waits at the gate before entering the Runnable and at every
/// [`checkpoint`](super::checkpoint).
pub(crate) struct Gate {
    open: Mutex<bool>,
    condvar: Condvar,
}

impl Gate {
    fn new(open: bool) -> Self {
        Self {
            open: Mutex::new(open),
            condvar: Condvar::new(),
        }
    }

    pub(crate) fn pass(&self) {
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.condvar.wait(open).unwrap();
        }
    }

    fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.condvar.notify_all();
    }

    fn close(&self) {
        *self.open.lock().unwrap() = false;
    }
}

/// State shared between a [`ManagedThread`] and its OS thread.
pub(crate) struct Shared {
    name: String,
    state: AtomicU8,
    pub(crate) canceled_by_user: AtomicBool,
    crash_on_unexpected_exit: bool,

    /// Set once by the body when it ends unexpectedly on a watched thread.
    crashed: AtomicBool,
    crash_event: Option<Event>,
    pub(crate) gate: Gate,

    /// Manual-reset event set when the body has finished; the waitable
    /// handle of the thread.
    done: Event,

    return_code: AtomicI32,
    exception: Mutex<Option<CapturedException>>,
}

impl Shared {
    fn canceled(&self) -> bool {
        self.canceled_by_user.load(Ordering::Acquire)
    }

    fn record_exception(&self, exception: CapturedException) {
        tracing::debug!(
            thread = %self.name,
            kind = exception.type_name(),
            message = exception.message(),
            "runnable raised"
        );

        self.return_code.store(EXCEPTION_RETURN_CODE, Ordering::Release);
        *self.exception.lock().unwrap() = Some(exception);
    }
}

/// Publishes the final state and signals completion when the body ends,
/// including when it unwinds with a fatal error.
struct Completion<'a>(&'a Shared);

impl Drop for Completion<'_> {
    fn drop(&mut self) {
        let shared = self.0;

        let crashed = thread::panicking() || shared.crashed.load(Ordering::Acquire);

        let state = if crashed { CRASHED } else { COMPLETED };
        shared.state.store(state, Ordering::Release);
        shared.done.set();
    }
}

/// A Runnable executing on its own OS thread.
///
/// Created through [`ThreadBuilder::spawn`] (or [`ManagedThread::spawn`]
/// with the default configuration). The thread follows
/// `Created -> Running -> {Completed | CrashedUnexpectedly} -> Joined`.
///
/// Errors returned by the Runnable and panics raised inside it are caught
/// on the thread and recorded; they never cross the thread boundary. An
/// exit without a prior [`cancel`](Self::cancel) is an *unexpected exit*:
/// with `crash_notify` it sets the crash event, otherwise with
/// `crash_on_unexpected_exit` it escalates a
/// [`FatalError::UnexpectedExit`]. This only tells "returned after cancel"
/// from "returned without cancel"; it does not trap faults such as stack
/// overflows.
///
/// Dropping a `ManagedThread` cancels it, releases it if paused and joins
/// it, so the drop blocks until the Runnable honors the cancel. A thread
/// canceled before it ever started never enters its Runnable.
pub struct ManagedThread {
    shared: Arc<Shared>,
    runnable: Arc<dyn Runnable>,
    join: Mutex<Option<JoinHandle<()>>>,
    fatal: Mutex<Option<FatalError>>,
}

impl ManagedThread {
    /// Starts `runnable` with the default [`ThreadBuilder`] configuration.
    pub fn spawn(runnable: Arc<dyn Runnable>) -> Self {
        ThreadBuilder::new().spawn(runnable)
    }

    pub(crate) fn start(builder: ThreadBuilder, runnable: Arc<dyn Runnable>) -> Self {
        let name = builder.thread_name();

        let shared = Arc::new(Shared {
            name: name.clone(),
            state: AtomicU8::new(CREATED),
            canceled_by_user: AtomicBool::new(false),
            crashed: AtomicBool::new(false),
            crash_on_unexpected_exit: builder.crash_on_unexpected_exit_enabled(),
            crash_event: builder.crash_notify_enabled().then(Event::new),
            gate: Gate::new(builder.runs_immediately()),
            done: Event::manual(),
            return_code: AtomicI32::new(0),
            exception: Mutex::new(None),
        });

        let mut os_thread = thread::Builder::new().name(name.clone());
        if let Some(bytes) = builder.stack() {
            os_thread = os_thread.stack_size(bytes);
        }

        let body_shared = Arc::clone(&shared);
        let body_runnable = Arc::clone(&runnable);
        let handle = os_thread
            .spawn(move || thread_main(body_shared, body_runnable))
            .or_fatal("spawn managed thread");

        tracing::debug!(
            thread = %name,
            paused = !builder.runs_immediately(),
            "managed thread spawned"
        );

        Self {
            shared,
            runnable,
            join: Mutex::new(Some(handle)),
            fatal: Mutex::new(None),
        }
    }

    /// Releases a thread created paused (or paused with [`pause`](Self::pause)).
    pub fn run(&self) {
        self.shared.gate.open();
        tracing::debug!(thread = %self.shared.name, "managed thread released");
    }

    /// Pauses the thread.
    ///
    /// Best-effort: a body that has not started yet waits at the start
    /// gate; a running body only stops at its next
    /// [`checkpoint`](super::checkpoint).
    pub fn pause(&self) {
        self.shared.gate.close();
    }

    /// Requests cancellation.
    ///
    /// Marks the thread as canceled by its owner (so its exit is no longer
    /// unexpected) and forwards the request to the Runnable. Returns the
    /// Runnable's answer; the body may keep running either way.
    pub fn cancel(&self) -> bool {
        self.shared.canceled_by_user.store(true, Ordering::Release);

        let acknowledged = self.runnable.request_cancel();
        if !acknowledged {
            tracing::warn!(thread = %self.shared.name, "runnable declined cancellation");
        }

        acknowledged
    }

    /// Blocks until the thread has finished, then releases it.
    pub fn join(&self) {
        self.shared.done.join();
        self.reap();
    }

    /// Blocks until the thread has finished or `timeout` elapses.
    ///
    /// Returns `false` on timeout, leaving the thread untouched.
    pub fn join_timeout(&self, timeout: Duration) -> bool {
        if !self.shared.done.join_timeout(timeout) {
            return false;
        }

        self.reap();
        true
    }

    /// Joins the OS thread exactly once.
    fn reap(&self) {
        let Some(handle) = self.join.lock().unwrap().take() else {
            return;
        };

        if let Err(payload) = handle.join() {
            match payload.downcast::<FatalError>() {
                Ok(fatal) => *self.fatal.lock().unwrap() = Some(*fatal),
                Err(_) => {
                    tracing::error!(thread = %self.shared.name, "managed thread unwound outside its runnable");
                }
            }
        }

        self.shared.state.store(JOINED, Ordering::Release);
        tracing::debug!(thread = %self.shared.name, "managed thread joined");
    }

    /// Returns the waitable handle signaled when the thread has finished.
    pub fn handle(&self) -> RawHandle {
        self.shared.done.handle()
    }

    /// Returns the handle of the crash event, if `crash_notify` was enabled.
    pub fn crash_event_handle(&self) -> Option<RawHandle> {
        self.shared.crash_event.as_ref().map(Event::handle)
    }

    /// Returns the Runnable's exit code, [`EXCEPTION_RETURN_CODE`] if it
    /// raised, or `0` while it has not returned.
    pub fn return_code(&self) -> i32 {
        self.shared.return_code.load(Ordering::Acquire)
    }

    /// Returns `true` until the body has finished (a paused thread counts
    /// as running).
    pub fn is_running(&self) -> bool {
        !self.shared.done.is_signaled()
    }

    /// Returns `true` if the Runnable ended with an error or a panic.
    pub fn is_exception_thrown(&self) -> bool {
        self.shared.exception.lock().unwrap().is_some()
    }

    /// Returns the captured error or panic.
    pub fn exception(&self) -> Option<CapturedException> {
        self.shared.exception.lock().unwrap().clone()
    }

    /// Returns the type tag of the captured exception.
    pub fn exception_type(&self) -> Option<String> {
        self.exception().map(|e| e.type_name().to_owned())
    }

    /// Returns the message of the captured exception.
    pub fn exception_message(&self) -> Option<String> {
        self.exception().map(|e| e.message().to_owned())
    }

    /// Takes the fatal error the thread unwound with.
    ///
    /// Only populated under [`FatalAction::Unwind`](crate::error::FatalAction::Unwind)
    /// and after a join.
    pub fn take_fatal_error(&self) -> Option<FatalError> {
        self.fatal.lock().unwrap().take()
    }

    /// Returns the Runnable.
    pub fn runnable(&self) -> &Arc<dyn Runnable> {
        &self.runnable
    }

    /// Returns the thread name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> ThreadState {
        ThreadState::from_raw(self.shared.state.load(Ordering::Acquire))
    }
}

impl AsRef<ManagedThread> for ManagedThread {
    fn as_ref(&self) -> &ManagedThread {
        self
    }
}

impl Drop for ManagedThread {
    fn drop(&mut self) {
        if self.join.lock().unwrap().is_none() {
            return;
        }

        // Canceled before the gate opens, so a paused body never starts.
        self.shared.canceled_by_user.store(true, Ordering::Release);
        if self.is_running() {
            self.runnable.request_cancel();
        }
        self.shared.gate.open();
        self.join();
    }
}

/// Body of every managed thread.
fn thread_main(shared: Arc<Shared>, runnable: Arc<dyn Runnable>) {
    let _completion = Completion(&shared);

    shared.gate.pass();

    if shared.canceled() {
        tracing::debug!(thread = %shared.name, "managed thread canceled before start");
        return;
    }

    shared.state.store(RUNNING, Ordering::Release);

    tracing::debug!(thread = %shared.name, "managed thread running");

    let outcome = enter_context(Arc::clone(&shared), || {
        panic::catch_unwind(AssertUnwindSafe(|| runnable.run()))
    });

    match outcome {
        Ok(Ok(code)) => shared.return_code.store(code, Ordering::Release),
        Ok(Err(error)) => shared.record_exception(CapturedException::from_error(error)),
        Err(payload) => {
            if payload.is::<FatalError>() {
                panic::resume_unwind(payload);
            }
            shared.record_exception(CapturedException::from_panic(&*payload));
        }
    }

    let canceled = shared.canceled();
    let watched = shared.crash_on_unexpected_exit || shared.crash_event.is_some();

    if !canceled && watched {
        shared.crashed.store(true, Ordering::Release);

        match &shared.crash_event {
            Some(event) => event.set(),
            None if shared.crash_on_unexpected_exit => escalate(FatalError::UnexpectedExit {
                thread: shared.name.clone(),
            }),
            None => {}
        }
    }

    tracing::debug!(thread = %shared.name, canceled, "managed thread finished");
}
