use super::managed::ManagedThread;
use super::worker::WorkerWrapper;
use super::Runnable;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Builder for configuring and starting managed threads.
///
/// By default a thread starts immediately, is not watched for unexpected
/// exits and has no crash event.
///
/// # Examples
///
/// ```rust,ignore
/// let worker = ThreadBuilder::new()
///     .name("indexer")
///     .crash_notify(true)
///     .wrap(Indexer::default());
/// ```
#[derive(Clone, Debug)]
pub struct ThreadBuilder {
    /// Thread name; generated when unset.
    name: Option<String>,

    /// Escalate a fatal error when the body returns without a cancel.
    crash_on_unexpected_exit: bool,

    /// Allocate a crash event set when the body returns without a cancel.
    crash_notify: bool,

    /// Start the body right away instead of holding it at the start gate.
    run_immediately: bool,

    /// Stack size of the OS thread; the platform default when unset.
    stack_size: Option<usize>,
}

impl ThreadBuilder {
    /// Creates a builder with the default configuration.
    pub fn new() -> Self {
        Self {
            name: None,
            crash_on_unexpected_exit: false,
            crash_notify: false,
            run_immediately: true,
            stack_size: None,
        }
    }

    /// Names the OS thread. The name also appears in logs and in
    /// [`FatalError::UnexpectedExit`](crate::error::FatalError::UnexpectedExit).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Treats a body that returns without a prior
    /// [`cancel`](ManagedThread::cancel) as a fatal error.
    ///
    /// Ignored when [`crash_notify`](Self::crash_notify) is enabled: the
    /// crash event is set instead.
    pub fn crash_on_unexpected_exit(mut self, enable: bool) -> Self {
        self.crash_on_unexpected_exit = enable;
        self
    }

    /// Sets a crash event whenever the body ends without a prior
    /// [`cancel`](ManagedThread::cancel).
    pub fn crash_notify(mut self, enable: bool) -> Self {
        self.crash_notify = enable;
        self
    }

    /// When `false`, the thread is created paused and only enters the
    /// Runnable after [`run`](ManagedThread::run).
    pub fn run_immediately(mut self, enable: bool) -> Self {
        self.run_immediately = enable;
        self
    }

    /// Sets the stack size of the OS thread.
    ///
    /// # Panics
    ///
    /// Panics if `bytes == 0`.
    pub fn stack_size(mut self, bytes: usize) -> Self {
        assert!(bytes > 0, "stack_size must be > 0");

        self.stack_size = Some(bytes);
        self
    }

    /// Starts a managed thread running `runnable`.
    pub fn spawn(self, runnable: Arc<dyn Runnable>) -> ManagedThread {
        ManagedThread::start(self, runnable)
    }

    /// Starts a managed thread that owns `runnable`.
    pub fn wrap<R: Runnable>(self, runnable: R) -> WorkerWrapper<R> {
        let runnable = Arc::new(runnable);
        let thread = self.spawn(runnable.clone());

        WorkerWrapper::from_parts(runnable, thread)
    }

    pub(crate) fn thread_name(&self) -> String {
        static NEXT: AtomicUsize = AtomicUsize::new(0);

        match &self.name {
            Some(name) => name.clone(),
            None => format!("managed-{}", NEXT.fetch_add(1, Ordering::Relaxed)),
        }
    }

    pub(crate) fn crash_on_unexpected_exit_enabled(&self) -> bool {
        self.crash_on_unexpected_exit
    }

    pub(crate) fn crash_notify_enabled(&self) -> bool {
        self.crash_notify
    }

    pub(crate) fn runs_immediately(&self) -> bool {
        self.run_immediately
    }

    pub(crate) fn stack(&self) -> Option<usize> {
        self.stack_size
    }
}

impl Default for ThreadBuilder {
    /// Creates a default `ThreadBuilder`.
    fn default() -> Self {
        Self::new()
    }
}
