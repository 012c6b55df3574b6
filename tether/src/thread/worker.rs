use super::builder::ThreadBuilder;
use super::managed::ManagedThread;
use super::state::ThreadState;
use super::{CapturedException, Runnable};
use crate::handle::RawHandle;

use std::sync::Arc;
use std::time::Duration;

/// A Runnable together with the managed thread running it.
///
/// The wrapper owns both, so the Runnable cannot be released while its
/// thread still uses it: dropping the wrapper cancels and joins the thread
/// first. It mirrors the [`ManagedThread`] API and adds typed access to the
/// Runnable through [`runnable`](Self::runnable).
pub struct WorkerWrapper<R: Runnable> {
    // Declared first: the thread is joined before the Runnable is released.
    thread: ManagedThread,
    runnable: Arc<R>,
}

impl<R: Runnable> WorkerWrapper<R> {
    /// Starts `runnable` with the default [`ThreadBuilder`] configuration.
    pub fn new(runnable: R) -> Self {
        ThreadBuilder::new().wrap(runnable)
    }

    pub(crate) fn from_parts(runnable: Arc<R>, thread: ManagedThread) -> Self {
        Self { thread, runnable }
    }

    /// Returns the Runnable.
    pub fn runnable(&self) -> &R {
        &self.runnable
    }

    /// Returns the managed thread.
    pub fn thread(&self) -> &ManagedThread {
        &self.thread
    }

    /// See [`ManagedThread::run`].
    pub fn run(&self) {
        self.thread.run();
    }

    /// See [`ManagedThread::pause`].
    pub fn pause(&self) {
        self.thread.pause();
    }

    /// See [`ManagedThread::join`].
    pub fn join(&self) {
        self.thread.join();
    }

    /// See [`ManagedThread::join_timeout`].
    pub fn join_timeout(&self, timeout: Duration) -> bool {
        self.thread.join_timeout(timeout)
    }

    /// See [`ManagedThread::cancel`].
    pub fn cancel(&self) -> bool {
        self.thread.cancel()
    }

    /// See [`ManagedThread::is_running`].
    pub fn is_running(&self) -> bool {
        self.thread.is_running()
    }

    /// See [`ManagedThread::handle`].
    pub fn handle(&self) -> RawHandle {
        self.thread.handle()
    }

    /// See [`ManagedThread::crash_event_handle`].
    pub fn crash_event_handle(&self) -> Option<RawHandle> {
        self.thread.crash_event_handle()
    }

    /// See [`ManagedThread::return_code`].
    pub fn return_code(&self) -> i32 {
        self.thread.return_code()
    }

    /// See [`ManagedThread::is_exception_thrown`].
    pub fn is_exception_thrown(&self) -> bool {
        self.thread.is_exception_thrown()
    }

    /// See [`ManagedThread::exception`].
    pub fn exception(&self) -> Option<CapturedException> {
        self.thread.exception()
    }

    /// See [`ManagedThread::exception_type`].
    pub fn exception_type(&self) -> Option<String> {
        self.thread.exception_type()
    }

    /// See [`ManagedThread::exception_message`].
    pub fn exception_message(&self) -> Option<String> {
        self.thread.exception_message()
    }

    /// See [`ManagedThread::state`].
    pub fn state(&self) -> ThreadState {
        self.thread.state()
    }
}

impl<R: Runnable> AsRef<ManagedThread> for WorkerWrapper<R> {
    fn as_ref(&self) -> &ManagedThread {
        &self.thread
    }
}
