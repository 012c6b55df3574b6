use super::ProcessHandle;
use crate::error::OrFatal;
use crate::event::Event;
use crate::handle::RawHandle;
use crate::handle::wait::wait_any;

use crossbeam_queue::SegQueue;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle, ThreadId};

/// Index of the finalize event in a watcher's wait list.
const FINALIZE: usize = 1;

/// State shared between a [`ProcessSet`] and its watcher threads.
struct Shared {
    /// Processes that exited and were not picked yet.
    exited: SegQueue<ProcessHandle>,

    /// Set after every push to `exited`.
    notify: Event,

    /// Manual-reset broadcast that releases every watcher at teardown.
    finalize: Event,

    /// Live watcher threads, keyed by their thread id.
    watchers: Mutex<HashMap<ThreadId, JoinHandle<()>>>,
}

/// Reports the exits of a dynamic set of processes.
///
/// Every [`add`](Self::add) starts one watcher thread that blocks on the
/// process handle and on a shared finalize event. When the process exits
/// the watcher pushes the handle onto the exit queue, signals the
/// notification event, unregisters itself and ends. Each added process is
/// therefore reported at most once.
///
/// The notification event is auto-reset and is set once per exit, so a
/// single wakeup may cover several exits: drain
/// [`pick_last_exited`](Self::pick_last_exited) until it returns `None`.
///
/// Dropping the set releases every remaining watcher through the finalize
/// event and joins them; their process handles are dropped unreported.
pub struct ProcessSet {
    shared: Arc<Shared>,
}

impl ProcessSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                exited: SegQueue::new(),
                notify: Event::new(),
                finalize: Event::manual(),
                watchers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Starts watching `process`.
    ///
    /// The handle is given back by [`pick_last_exited`](Self::pick_last_exited)
    /// once the process has exited.
    pub fn add(&self, process: ProcessHandle) {
        let pid = process.pid();
        let shared = Arc::clone(&self.shared);

        // Held across the spawn so a fast watcher cannot try to unregister
        // before it is registered.
        let mut watchers = self.shared.watchers.lock().unwrap();

        let handle = thread::Builder::new()
            .name(format!("process-watcher-{pid}"))
            .spawn(move || watch(shared, process))
            .or_fatal("spawn process watcher");

        watchers.insert(handle.thread().id(), handle);

        tracing::debug!(pid, watchers = watchers.len(), "watching process");
    }

    /// Pops the next exited process, or returns `None` if none is pending.
    pub fn pick_last_exited(&self) -> Option<ProcessHandle> {
        self.shared.exited.pop()
    }

    /// Returns the handle of the notification event.
    pub fn event_handle(&self) -> RawHandle {
        self.shared.notify.handle()
    }

    /// Returns the number of watcher threads still registered.
    pub fn watcher_count(&self) -> usize {
        self.shared.watchers.lock().unwrap().len()
    }
}

impl Default for ProcessSet {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProcessSet {
    /// Stops and joins every remaining watcher.
    ///
    /// The registry is emptied under the lock before the finalize event
    /// is set, and the joins happen after the lock is released. Watchers
    /// that finish concurrently find no entry to remove and just end.
    fn drop(&mut self) {
        let running: Vec<JoinHandle<()>> = {
            let mut watchers = self.shared.watchers.lock().unwrap();
            let running = watchers.drain().map(|(_, handle)| handle).collect();
            self.shared.finalize.set();
            running
        };

        tracing::debug!(watchers = running.len(), "stopping process watchers");

        for handle in running {
            let name = handle.thread().name().map(str::to_owned);
            if handle.join().is_err() {
                tracing::error!(thread = ?name, "process watcher panicked");
            }
        }
    }
}

/// Body of a watcher thread.
fn watch(shared: Arc<Shared>, process: ProcessHandle) {
    let pid = process.pid();

    if wait_any(&[process.handle(), shared.finalize.handle()]) == FINALIZE {
        tracing::debug!(pid, "process watcher finalized");
        return;
    }

    shared.exited.push(process);
    shared.notify.set();

    tracing::debug!(pid, "process exited");

    let own = shared
        .watchers
        .lock()
        .unwrap()
        .remove(&thread::current().id());

    // Dropping our own join handle detaches this thread, which is about to end.
    drop(own);
}
