use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;
use tether::handle::wait;
use tether::thread::{CapturedException, EXCEPTION_RETURN_CODE, ThreadState, cancel_requested, checkpoint};
use tether::{Event, JobError, ManagedThread, Runnable, ThreadBuilder};

struct Fixed(i32);

impl Runnable for Fixed {
    fn run(&self) -> Result<i32, JobError> {
        Ok(self.0)
    }

    fn request_cancel(&self) -> bool {
        true
    }
}

struct Failing;

fn load_config() -> io::Result<i32> {
    Err(io::Error::new(io::ErrorKind::NotFound, "config missing"))
}

impl Runnable for Failing {
    fn run(&self) -> Result<i32, JobError> {
        let code = load_config()?;
        Ok(code)
    }

    fn request_cancel(&self) -> bool {
        true
    }
}

struct Panicking;

impl Runnable for Panicking {
    fn run(&self) -> Result<i32, JobError> {
        panic!("boom");
    }

    fn request_cancel(&self) -> bool {
        true
    }
}

/// Runs until canceled, counting its iterations.
#[derive(Default)]
struct Spinner {
    stop: AtomicBool,
    started: AtomicBool,
    iterations: AtomicUsize,
}

impl Runnable for Spinner {
    fn run(&self) -> Result<i32, JobError> {
        self.started.store(true, Ordering::Release);

        while !self.stop.load(Ordering::Acquire) {
            self.iterations.fetch_add(1, Ordering::AcqRel);
            thread::sleep(Duration::from_millis(1));
        }

        Ok(3)
    }

    fn request_cancel(&self) -> bool {
        self.stop.store(true, Ordering::Release);
        true
    }
}

/// Ignores cancel requests; only `release` ends it.
struct Stubborn {
    release: Event,
}

impl Stubborn {
    fn new() -> Self {
        Self {
            release: Event::manual(),
        }
    }
}

impl Runnable for Stubborn {
    fn run(&self) -> Result<i32, JobError> {
        self.release.join();
        Ok(0)
    }

    fn request_cancel(&self) -> bool {
        false
    }
}

/// Polls the cancel flag of its own thread and honors pauses.
#[derive(Default)]
struct Cooperative {
    iterations: AtomicUsize,
}

impl Runnable for Cooperative {
    fn run(&self) -> Result<i32, JobError> {
        loop {
            checkpoint();
            if cancel_requested() {
                return Ok(9);
            }

            self.iterations.fetch_add(1, Ordering::AcqRel);
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn request_cancel(&self) -> bool {
        true
    }
}

#[test]
fn test_return_code() {
    let thread = ManagedThread::spawn(Arc::new(Fixed(7)));

    thread.join();

    assert_eq!(thread.return_code(), 7);
    assert!(!thread.is_running());
    assert!(!thread.is_exception_thrown());
    assert_eq!(thread.exception(), None);
    assert_eq!(thread.state(), ThreadState::Joined);
}

#[test]
fn test_error_is_captured_with_type() {
    let thread = ManagedThread::spawn(Arc::new(Failing));

    thread.join();

    assert!(thread.is_exception_thrown());
    assert_eq!(thread.return_code(), EXCEPTION_RETURN_CODE);
    assert_eq!(thread.exception_type().as_deref(), Some(std::any::type_name::<io::Error>()));
    assert_eq!(thread.exception_message().as_deref(), Some("config missing"));
}

#[test]
fn test_message_error_is_tagged_as_job_error() {
    struct Refusing;

    impl Runnable for Refusing {
        fn run(&self) -> Result<i32, JobError> {
            Err(JobError::msg("nothing to do"))
        }

        fn request_cancel(&self) -> bool {
            true
        }
    }

    let thread = ManagedThread::spawn(Arc::new(Refusing));
    thread.join();

    assert_eq!(thread.exception_type().as_deref(), Some(std::any::type_name::<JobError>()));
    assert_eq!(thread.exception_message().as_deref(), Some("nothing to do"));
}

#[test]
fn test_panic_is_captured() {
    let thread = ManagedThread::spawn(Arc::new(Panicking));

    thread.join();

    let exception = thread.exception().unwrap();
    assert_eq!(exception.type_name(), CapturedException::PANIC);
    assert_eq!(exception.message(), "boom");
    assert_eq!(thread.return_code(), EXCEPTION_RETURN_CODE);
    assert_eq!(thread.state(), ThreadState::Joined);
}

#[test]
fn test_cancel_stops_runnable() {
    let spinner = Arc::new(Spinner::default());
    let thread = ManagedThread::spawn(spinner.clone());

    assert!(thread.is_running());
    assert!(thread.cancel());

    thread.join();
    assert_eq!(thread.return_code(), 3);
    assert!(spinner.stop.load(Ordering::Acquire));
}

#[test]
fn test_join_timeout_on_running_thread() {
    let stubborn = Arc::new(Stubborn::new());
    let thread = ManagedThread::spawn(stubborn.clone());

    assert!(!thread.join_timeout(Duration::from_millis(30)));
    assert!(thread.is_running());
    assert_ne!(thread.state(), ThreadState::Joined);

    stubborn.release.set();
    assert!(thread.join_timeout(Duration::from_secs(5)));
    assert_eq!(thread.state(), ThreadState::Joined);
}

#[test]
fn test_join_twice() {
    let thread = ManagedThread::spawn(Arc::new(Fixed(1)));

    thread.join();
    thread.join();
    assert!(thread.join_timeout(Duration::ZERO));
}

#[test]
fn test_paused_start_waits_for_run() {
    let spinner = Arc::new(Spinner::default());
    let thread = ThreadBuilder::new()
        .run_immediately(false)
        .spawn(spinner.clone());

    thread::sleep(Duration::from_millis(30));
    assert!(!spinner.started.load(Ordering::Acquire));
    assert_eq!(thread.state(), ThreadState::Created);
    assert!(thread.is_running());

    thread.run();
    while !spinner.started.load(Ordering::Acquire) {
        thread::yield_now();
    }

    thread.cancel();
    thread.join();
    assert_eq!(thread.return_code(), 3);
}

#[test]
fn test_pause_at_checkpoint() {
    let body = Arc::new(Cooperative::default());
    let thread = ManagedThread::spawn(body.clone());

    while body.iterations.load(Ordering::Acquire) == 0 {
        thread::yield_now();
    }

    thread.pause();
    thread::sleep(Duration::from_millis(30));
    let paused_at = body.iterations.load(Ordering::Acquire);
    thread::sleep(Duration::from_millis(30));
    assert_eq!(body.iterations.load(Ordering::Acquire), paused_at);

    thread.run();
    while body.iterations.load(Ordering::Acquire) == paused_at {
        thread::yield_now();
    }

    thread.cancel();
    thread.join();
    assert_eq!(thread.return_code(), 9);
}

#[test]
fn test_cancel_flag_outside_managed_thread() {
    assert!(!cancel_requested());
    checkpoint();
}

#[test]
fn test_crash_notify_on_unexpected_exit() {
    let thread = ThreadBuilder::new().crash_notify(true).spawn(Arc::new(Fixed(0)));

    let crash = thread.crash_event_handle().unwrap();
    assert!(wait::wait_timeout(crash, Duration::from_secs(5)));

    wait::wait(thread.handle());
    assert_eq!(thread.state(), ThreadState::CrashedUnexpectedly);

    thread.join();
    assert_eq!(thread.state(), ThreadState::Joined);
}

#[test]
fn test_crash_notify_silent_after_cancel() {
    let thread = ThreadBuilder::new()
        .crash_notify(true)
        .spawn(Arc::new(Spinner::default()));

    thread.cancel();
    wait::wait(thread.handle());

    assert_eq!(thread.state(), ThreadState::Completed);
    assert!(!wait::is_signaled(thread.crash_event_handle().unwrap()));
}

#[test]
fn test_unwatched_thread_completes() {
    let thread = ManagedThread::spawn(Arc::new(Fixed(0)));

    assert_eq!(thread.crash_event_handle(), None);
    wait::wait(thread.handle());
    assert_eq!(thread.state(), ThreadState::Completed);
}

#[test]
fn test_drop_cancels_and_joins() {
    let spinner = Arc::new(Spinner::default());
    let thread = ManagedThread::spawn(spinner.clone());

    while !spinner.started.load(Ordering::Acquire) {
        thread::yield_now();
    }

    drop(thread);
    assert!(spinner.stop.load(Ordering::Acquire));
    assert_eq!(Arc::strong_count(&spinner), 1);
}

#[test]
fn test_drop_releases_paused_thread() {
    let spinner = Arc::new(Spinner::default());
    let thread = ThreadBuilder::new()
        .run_immediately(false)
        .spawn(spinner.clone());

    drop(thread);
    assert_eq!(Arc::strong_count(&spinner), 1);
}

#[test]
fn test_thread_name() {
    let thread = ThreadBuilder::new().name("indexer").spawn(Arc::new(Fixed(0)));
    assert_eq!(thread.name(), "indexer");

    let unnamed = ManagedThread::spawn(Arc::new(Fixed(0)));
    assert!(unnamed.name().starts_with("managed-"));
}

#[test]
fn test_custom_stack_size() {
    let thread = ThreadBuilder::new()
        .stack_size(256 * 1024)
        .spawn(Arc::new(Fixed(4)));

    thread.join();
    assert_eq!(thread.return_code(), 4);
}

#[test]
#[should_panic(expected = "stack_size must be > 0")]
fn test_zero_stack_size_panics() {
    let _ = ThreadBuilder::new().stack_size(0);
}

#[test]
#[tracing_test::traced_test]
fn test_declined_cancel_is_logged() {
    let stubborn = Arc::new(Stubborn::new());
    let thread = ManagedThread::spawn(stubborn.clone());

    assert!(!thread.cancel());
    assert!(logs_contain("runnable declined cancellation"));

    stubborn.release.set();
    thread.join();
}

#[test]
fn test_cancel_after_crash_event_keeps_crashed_state() {
    for _ in 0..50 {
        let thread = ThreadBuilder::new().crash_notify(true).spawn(Arc::new(Fixed(0)));

        let crash = thread.crash_event_handle().unwrap();
        assert!(wait::wait_timeout(crash, Duration::from_secs(5)));

        thread.cancel();
        wait::wait(thread.handle());
        assert_eq!(thread.state(), ThreadState::CrashedUnexpectedly);
    }
}

#[test]
fn test_drop_skips_never_started_body() {
    let spinner = Arc::new(Spinner::default());
    let thread = ThreadBuilder::new()
        .run_immediately(false)
        .spawn(spinner.clone());

    drop(thread);
    assert!(!spinner.started.load(Ordering::Acquire));
}
