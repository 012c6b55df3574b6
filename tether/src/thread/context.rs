use super::managed::Shared;

use std::cell::RefCell;
use std::sync::Arc;
use std::sync::atomic::Ordering;

thread_local! {
    /// State of the managed thread running on this OS thread, if any.
    ///
    /// Installed for the duration of the Runnable's entry point so that
    /// code deep inside it can reach the gate and the cancel flag without
    /// passing the thread around.
    static CURRENT: RefCell<Option<Arc<Shared>>> = const { RefCell::new(None) };
}

/// Runs `f` with `shared` installed as the current managed thread.
pub(crate) fn enter_context<R>(shared: Arc<Shared>, f: impl FnOnce() -> R) -> R {
    let prev = CURRENT.with(|current| current.replace(Some(shared)));
    let out = f();
    CURRENT.with(|current| current.replace(prev));

    out
}

/// Blocks while the current managed thread is paused.
///
/// [`ManagedThread::pause`](super::ManagedThread::pause) cannot stop a body
/// that is already executing; long-running Runnables call `checkpoint` at
/// convenient points to honor it. Outside a managed thread this returns
/// immediately.
pub fn checkpoint() {
    CURRENT.with(|current| {
        if let Some(shared) = current.borrow().as_ref() {
            shared.gate.pass();
        }
    });
}

/// Returns `true` if the current managed thread has been canceled by its
/// owner. Outside a managed thread this is always `false`.
pub fn cancel_requested() -> bool {
    CURRENT.with(|current| {
        current
            .borrow()
            .as_ref()
            .is_some_and(|shared| shared.canceled_by_user.load(Ordering::Acquire))
    })
}
