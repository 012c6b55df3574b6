use std::sync::Arc;
use std::time::Duration;
use tether::thread::join::{join_all, join_all_timeout, join_any, join_any_timeout};
use tether::{Event, JobError, ManagedThread, Runnable, WorkerWrapper};

/// Returns its code once released.
struct Gated {
    code: i32,
    release: Event,
}

impl Gated {
    fn new(code: i32) -> Self {
        Self {
            code,
            release: Event::manual(),
        }
    }
}

impl Runnable for Gated {
    fn run(&self) -> Result<i32, JobError> {
        self.release.join();
        Ok(self.code)
    }

    fn request_cancel(&self) -> bool {
        self.release.set();
        true
    }
}

#[test]
fn test_join_any_returns_finished_index() {
    let bodies: Vec<Arc<Gated>> = (0..3).map(|i| Arc::new(Gated::new(i))).collect();
    let threads: Vec<ManagedThread> = bodies
        .iter()
        .map(|body| ManagedThread::spawn(body.clone()))
        .collect();

    bodies[2].release.set();
    let index = join_any(&threads);

    assert_eq!(index, 2);
    threads[index].join();
    assert_eq!(threads[index].return_code(), 2);
    assert!(threads[0].is_running());
}

#[test]
fn test_join_any_prefers_lowest_index() {
    let bodies: Vec<Arc<Gated>> = (0..3).map(|i| Arc::new(Gated::new(i))).collect();
    let threads: Vec<ManagedThread> = bodies
        .iter()
        .map(|body| ManagedThread::spawn(body.clone()))
        .collect();

    bodies[1].release.set();
    bodies[2].release.set();
    threads[1].join();
    threads[2].join();

    assert_eq!(join_any(&threads), 1);
}

#[test]
fn test_join_any_timeout() {
    let threads = vec![
        WorkerWrapper::new(Gated::new(0)),
        WorkerWrapper::new(Gated::new(1)),
    ];

    assert_eq!(join_any_timeout(&threads, Duration::from_millis(20)), None);

    threads[0].runnable().release.set();
    assert_eq!(join_any_timeout(&threads, Duration::from_secs(5)), Some(0));
}

#[test]
fn test_join_all_waits_for_every_thread() {
    let threads: Vec<WorkerWrapper<Gated>> =
        (0..4).map(|i| WorkerWrapper::new(Gated::new(i))).collect();

    threads[0].runnable().release.set();
    threads[3].runnable().release.set();
    assert!(!join_all_timeout(&threads, Duration::from_millis(20)));

    threads[1].runnable().release.set();
    threads[2].runnable().release.set();
    join_all(&threads);

    for (i, thread) in threads.iter().enumerate() {
        assert!(!thread.is_running());
        assert_eq!(thread.return_code(), i as i32);
    }
}
