use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;
use tether::thread::ThreadState;
use tether::{JobError, Runnable, ThreadBuilder, WorkerWrapper};

#[derive(Default)]
struct Counter {
    stop: AtomicBool,
    ticks: AtomicUsize,
    cancels: AtomicUsize,
}

impl Runnable for Counter {
    fn run(&self) -> Result<i32, JobError> {
        while !self.stop.load(Ordering::Acquire) {
            self.ticks.fetch_add(1, Ordering::AcqRel);
            thread::sleep(Duration::from_millis(1));
        }

        Ok(self.ticks.load(Ordering::Acquire).min(100) as i32)
    }

    fn request_cancel(&self) -> bool {
        self.cancels.fetch_add(1, Ordering::AcqRel);
        self.stop.store(true, Ordering::Release);
        true
    }
}

#[test]
fn test_wrapper_gives_typed_access() {
    let worker = WorkerWrapper::new(Counter::default());

    while worker.runnable().ticks.load(Ordering::Acquire) == 0 {
        thread::yield_now();
    }

    assert!(worker.is_running());
    assert!(worker.cancel());
    worker.join();

    assert_eq!(worker.runnable().cancels.load(Ordering::Acquire), 1);
    assert!(worker.return_code() > 0);
    assert!(!worker.is_exception_thrown());
    assert_eq!(worker.state(), ThreadState::Joined);
}

#[test]
fn test_wrapper_from_builder_starts_paused() {
    let worker = ThreadBuilder::new()
        .name("counter")
        .run_immediately(false)
        .wrap(Counter::default());

    assert_eq!(worker.thread().name(), "counter");
    assert!(!worker.join_timeout(Duration::from_millis(20)));
    assert_eq!(worker.runnable().ticks.load(Ordering::Acquire), 0);

    worker.run();
    while worker.runnable().ticks.load(Ordering::Acquire) == 0 {
        thread::yield_now();
    }

    worker.cancel();
    assert!(worker.join_timeout(Duration::from_secs(5)));
}

#[test]
fn test_wrapper_crash_event() {
    struct Once;

    impl Runnable for Once {
        fn run(&self) -> Result<i32, JobError> {
            Ok(5)
        }

        fn request_cancel(&self) -> bool {
            true
        }
    }

    let worker = ThreadBuilder::new().crash_notify(true).wrap(Once);

    let crash = worker.crash_event_handle().unwrap();
    assert!(tether::handle::wait::wait_timeout(crash, Duration::from_secs(5)));

    worker.join();
    assert_eq!(worker.return_code(), 5);
    assert_eq!(worker.exception_type(), None);
    assert_eq!(worker.exception_message(), None);
}

#[test]
fn test_drop_joins_before_releasing_runnable() {
    let worker = WorkerWrapper::new(Counter::default());
    let handle = worker.handle();

    while worker.runnable().ticks.load(Ordering::Acquire) == 0 {
        thread::yield_now();
    }

    assert!(!tether::handle::wait::is_signaled(handle));
    drop(worker);
}
