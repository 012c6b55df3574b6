//! A single blocking wait over handles contributed by many sources.
//!
//! Instead of one waiting thread per source, every [`WaitSource`]
//! registered with a [`WaitMultiplexer`] contributes its current handles to
//! one flattened list:
//!
//! ```text
//! [cancel] [source A: a0 a1] [source B: b0 b1 b2] ...
//!    0        1  2              3  4  5
//! ```
//!
//! [`run_loop`](WaitMultiplexer::run_loop) waits on the whole list, maps
//! the signaled index back to `(source, local index)` and calls the
//! source's [`callback`](WaitSource::callback). Index 0 is the built-in
//! cancel event; signaling it ends the loop.
//!
//! A source's slots always stay contiguous and in registration order.
//! The count recorded for a source is only refreshed by
//! [`update`](WaitMultiplexer::update); keeping it in sync with the source
//! is the caller's job. The flattened list, cancel slot included, is
//! bounded by [`MAX_WAIT_HANDLES`](crate::handle::wait::MAX_WAIT_HANDLES).
//!
//! The multiplexer is single-threaded (`!Send`): register, update, erase
//! and the loop itself run on one thread. Callbacks run on that thread and
//! may call [`update`](WaitMultiplexer::update) and
//! [`erase`](WaitMultiplexer::erase) re-entrantly. Only cancellation
//! crosses threads, through a [`Canceller`].

pub mod sources;

use crate::error::fatal;
use crate::event::Event;
use crate::handle::RawHandle;
use crate::handle::wait::wait_any;

use std::cell::RefCell;
use std::collections::HashMap;
use std::iter;
use std::rc::Rc;
use std::sync::Arc;

/// Index of the cancel event in the flattened list.
const CANCEL_INDEX: usize = 0;

/// Identity of a registered source: the address of its `Rc` allocation.
type SourceKey = usize;

/// A contributor of waitable handles.
///
/// Methods take `&self` because the multiplexer may query a source while
/// that source's callback is running; sources keep mutable state in cells.
pub trait WaitSource {
    /// Returns how many handles the source currently contributes.
    fn handle_count(&self) -> usize;

    /// Writes the source's current handles into `handles`, whose length is
    /// the count last returned by [`handle_count`](Self::handle_count).
    fn fill_handles(&self, handles: &mut [RawHandle]);

    /// Called when the handle at local `index` was signaled.
    fn callback(&self, index: usize);
}

struct Entry {
    key: SourceKey,
    source: Rc<dyn WaitSource>,
}

/// Cancels a [`WaitMultiplexer`] loop from any thread.
#[derive(Clone)]
pub struct Canceller {
    event: Arc<Event>,
}

impl Canceller {
    /// Signals the loop's cancel event.
    pub fn cancel(&self) {
        self.event.set();
    }
}

/// The dynamic wait loop.
pub struct WaitMultiplexer {
    cancel: Arc<Event>,

    /// `[cancel] ++ handles of every source in registration order`.
    handles: RefCell<Vec<RawHandle>>,

    /// Sources in registration order.
    sources: RefCell<Vec<Entry>>,

    /// Handle count recorded for each source.
    counts: RefCell<HashMap<SourceKey, usize>>,
}

impl WaitMultiplexer {
    /// Creates a multiplexer whose list holds only the cancel event.
    pub fn new() -> Self {
        let cancel = Arc::new(Event::new());
        let handles = vec![cancel.handle()];

        Self {
            cancel,
            handles: RefCell::new(handles),
            sources: RefCell::new(Vec::new()),
            counts: RefCell::new(HashMap::new()),
        }
    }

    /// Appends `source`'s handles to the end of the list.
    ///
    /// Registering a source twice is fatal.
    pub fn register<S: WaitSource + 'static>(&self, source: &Rc<S>) {
        let key = key_of(source);

        if self.counts.borrow().contains_key(&key) {
            fatal!("wait source {key:#x} is already registered");
        }

        let count = source.handle_count();
        {
            let mut handles = self.handles.borrow_mut();
            let start = handles.len();
            handles.resize(start + count, RawHandle::INVALID);
            source.fill_handles(&mut handles[start..]);
        }

        let source: Rc<dyn WaitSource> = source.clone();
        self.sources.borrow_mut().push(Entry { key, source });
        self.counts.borrow_mut().insert(key, count);

        tracing::debug!(source = key, count, total = self.len(), "wait source registered");
    }

    /// Re-reads `source`'s handles, growing or shrinking its slot range in
    /// place so every other source keeps its slots.
    ///
    /// Updating an unregistered source is fatal.
    pub fn update<S: WaitSource + 'static>(&self, source: &Rc<S>) {
        let key = key_of(source);
        let Some((_, offset)) = self.locate(key) else {
            fatal!("update of unregistered wait source {key:#x}");
        };

        let recorded = self.counts.borrow()[&key];
        let live = source.handle_count();

        {
            let mut handles = self.handles.borrow_mut();

            if live > recorded {
                let grown = iter::repeat_n(RawHandle::INVALID, live - recorded);
                handles.splice(offset..offset, grown);
            } else if live < recorded {
                handles.drain(offset..offset + (recorded - live));
            }

            source.fill_handles(&mut handles[offset..offset + live]);
        }

        self.counts.borrow_mut().insert(key, live);

        tracing::debug!(source = key, recorded, live, "wait source updated");
    }

    /// Removes `source` and its slots.
    ///
    /// Erasing an unregistered source is fatal.
    pub fn erase<S: WaitSource + 'static>(&self, source: &Rc<S>) {
        let key = key_of(source);
        let Some((position, offset)) = self.locate(key) else {
            fatal!("erase of unregistered wait source {key:#x}");
        };

        let recorded = self.counts.borrow_mut().remove(&key).unwrap_or(0);
        self.handles.borrow_mut().drain(offset..offset + recorded);
        self.sources.borrow_mut().remove(position);

        tracing::debug!(source = key, recorded, "wait source erased");
    }

    /// Waits and dispatches until the loop is canceled.
    ///
    /// Each wakeup dispatches exactly one signaled handle (the lowest
    /// index). A manual-reset handle that stays signaled is dispatched
    /// again on the next iteration, so its callback must reset or remove it.
    pub fn run_loop(&self) {
        loop {
            let index = wait_any(&self.handles.borrow());

            if index == CANCEL_INDEX {
                tracing::debug!("wait loop canceled");
                return;
            }

            let Some((source, local)) = self.resolve(index - 1) else {
                fatal!("signaled slot {index} belongs to no wait source");
            };

            tracing::trace!(index, local, "dispatching wait source");
            source.callback(local);
        }
    }

    /// Signals the cancel event; [`run_loop`](Self::run_loop) returns once
    /// its current wait wakes up.
    pub fn cancel(&self) {
        self.cancel.set();
    }

    /// Returns a handle that cancels this loop from another thread.
    pub fn canceller(&self) -> Canceller {
        Canceller {
            event: Arc::clone(&self.cancel),
        }
    }

    /// Returns a copy of the flattened handle list.
    pub fn handles(&self) -> Vec<RawHandle> {
        self.handles.borrow().clone()
    }

    /// Returns the length of the flattened list, cancel slot included.
    pub fn len(&self) -> usize {
        self.handles.borrow().len()
    }

    /// Returns `true` when no source contributes a handle.
    pub fn is_empty(&self) -> bool {
        self.len() == 1
    }

    /// Returns the number of registered sources.
    pub fn source_count(&self) -> usize {
        self.sources.borrow().len()
    }

    /// Returns the index of `source`'s first slot, if registered.
    pub fn offset_of<S: WaitSource + 'static>(&self, source: &Rc<S>) -> Option<usize> {
        self.locate(key_of(source)).map(|(_, offset)| offset)
    }

    /// Returns the handle count recorded for `source`, if registered.
    pub fn recorded_count<S: WaitSource + 'static>(&self, source: &Rc<S>) -> Option<usize> {
        self.counts.borrow().get(&key_of(source)).copied()
    }

    /// Finds a source's position in registration order and its first slot.
    fn locate(&self, key: SourceKey) -> Option<(usize, usize)> {
        let counts = self.counts.borrow();
        let mut offset = CANCEL_INDEX + 1;

        for (position, entry) in self.sources.borrow().iter().enumerate() {
            if entry.key == key {
                return Some((position, offset));
            }
            offset += counts[&entry.key];
        }

        None
    }

    /// Maps an index past the cancel slot to `(source, local index)`.
    fn resolve(&self, mut index: usize) -> Option<(Rc<dyn WaitSource>, usize)> {
        let counts = self.counts.borrow();

        for entry in self.sources.borrow().iter() {
            let count = counts[&entry.key];
            if index < count {
                return Some((Rc::clone(&entry.source), index));
            }
            index -= count;
        }

        None
    }
}

impl Default for WaitMultiplexer {
    fn default() -> Self {
        Self::new()
    }
}

fn key_of<S>(source: &Rc<S>) -> SourceKey {
    Rc::as_ptr(source) as *const () as usize
}
