//! Ready-made [`WaitSource`] implementations.

use super::WaitSource;
use crate::handle::RawHandle;
use crate::process::{ProcessHandle, ProcessSet};
use crate::timer::Timer;

use std::cell::{RefCell, RefMut};

/// A caller-edited list of handles with one callback.
///
/// The list borrows nothing: whoever owns the handles keeps them alive
/// while they are listed. After [`push`](Self::push) or
/// [`remove`](Self::remove) the owner calls
/// [`WaitMultiplexer::update`](super::WaitMultiplexer::update) so the loop
/// sees the new list.
pub struct HandleList {
    handles: RefCell<Vec<RawHandle>>,
    on_signal: Box<dyn Fn(usize, RawHandle)>,
}

impl HandleList {
    /// Creates an empty list calling `on_signal(index, handle)` on signals.
    pub fn new(on_signal: impl Fn(usize, RawHandle) + 'static) -> Self {
        Self {
            handles: RefCell::new(Vec::new()),
            on_signal: Box::new(on_signal),
        }
    }

    /// Appends a handle.
    pub fn push(&self, handle: RawHandle) {
        self.handles.borrow_mut().push(handle);
    }

    /// Removes and returns the handle at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn remove(&self, index: usize) -> RawHandle {
        self.handles.borrow_mut().remove(index)
    }

    /// Returns the number of listed handles.
    pub fn len(&self) -> usize {
        self.handles.borrow().len()
    }

    /// Returns `true` if no handle is listed.
    pub fn is_empty(&self) -> bool {
        self.handles.borrow().is_empty()
    }
}

impl WaitSource for HandleList {
    fn handle_count(&self) -> usize {
        self.len()
    }

    fn fill_handles(&self, handles: &mut [RawHandle]) {
        handles.copy_from_slice(&self.handles.borrow());
    }

    fn callback(&self, index: usize) {
        // The list may have shrunk since the multiplexer last looked.
        let Some(handle) = self.handles.borrow().get(index).copied() else {
            return;
        };

        (self.on_signal)(index, handle);
    }
}

/// Feeds process exits from a [`ProcessSet`] into a closure.
///
/// Contributes the set's notification event; every wakeup drains all
/// pending exits.
pub struct ProcessExitSource {
    set: ProcessSet,
    on_exit: RefCell<Box<dyn FnMut(ProcessHandle)>>,
}

impl ProcessExitSource {
    /// Creates a source over an empty set.
    pub fn new(on_exit: impl FnMut(ProcessHandle) + 'static) -> Self {
        Self {
            set: ProcessSet::new(),
            on_exit: RefCell::new(Box::new(on_exit)),
        }
    }

    /// Starts watching `process`.
    pub fn add(&self, process: ProcessHandle) {
        self.set.add(process);
    }

    /// Returns the underlying set.
    pub fn set(&self) -> &ProcessSet {
        &self.set
    }
}

impl WaitSource for ProcessExitSource {
    fn handle_count(&self) -> usize {
        1
    }

    fn fill_handles(&self, handles: &mut [RawHandle]) {
        handles[0] = self.set.event_handle();
    }

    fn callback(&self, _index: usize) {
        let mut on_exit = self.on_exit.borrow_mut();

        while let Some(process) = self.set.pick_last_exited() {
            on_exit(process);
        }
    }
}

/// Calls a closure on every expiration of a [`Timer`].
pub struct TimerSource {
    timer: RefCell<Timer>,
    on_tick: RefCell<Box<dyn FnMut()>>,
}

impl TimerSource {
    /// Wraps `timer`, which may be armed before or after registration.
    pub fn new(timer: Timer, on_tick: impl FnMut() + 'static) -> Self {
        Self {
            timer: RefCell::new(timer),
            on_tick: RefCell::new(Box::new(on_tick)),
        }
    }

    /// Gives mutable access to the timer (to arm, pause or disarm it).
    pub fn timer(&self) -> RefMut<'_, Timer> {
        self.timer.borrow_mut()
    }
}

impl WaitSource for TimerSource {
    fn handle_count(&self) -> usize {
        1
    }

    fn fill_handles(&self, handles: &mut [RawHandle]) {
        handles[0] = self.timer.borrow().handle();
    }

    fn callback(&self, _index: usize) {
        (self.on_tick.borrow_mut())();
    }
}
