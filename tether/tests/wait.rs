use std::time::{Duration, Instant};
use tether::handle::wait::{
    MAX_WAIT_HANDLES, is_signaled, wait_all, wait_all_timeout, wait_any, wait_any_timeout,
};
use tether::{Event, FatalAction, set_fatal_action};

#[test]
fn test_wait_any_returns_lowest_signaled_index() {
    let events: Vec<Event> = (0..4).map(|_| Event::manual()).collect();
    let handles: Vec<_> = events.iter().map(Event::handle).collect();

    events[3].set();
    events[1].set();

    assert_eq!(wait_any(&handles), 1);
    assert_eq!(wait_any(&handles), 1);

    events[1].reset();
    assert_eq!(wait_any(&handles), 3);
}

#[test]
fn test_wait_any_consumes_only_reported_auto_handle() {
    let first = Event::new();
    let second = Event::new();
    let handles = [first.handle(), second.handle()];

    first.set();
    second.set();

    assert_eq!(wait_any(&handles), 0);
    assert!(!first.is_signaled());
    assert!(second.is_signaled());

    assert_eq!(wait_any(&handles), 1);
    assert!(!second.is_signaled());
}

#[test]
fn test_wait_any_timeout_elapses() {
    let events = [Event::new(), Event::new()];
    let handles = [events[0].handle(), events[1].handle()];

    let start = Instant::now();
    assert_eq!(wait_any_timeout(&handles, Duration::from_millis(30)), None);
    assert!(start.elapsed() >= Duration::from_millis(30));
}

#[test]
fn test_wait_any_zero_timeout_polls() {
    let event = Event::new();

    assert_eq!(wait_any_timeout(&[event.handle()], Duration::ZERO), None);

    event.set();
    assert_eq!(wait_any_timeout(&[event.handle()], Duration::ZERO), Some(0));
}

#[test]
fn test_invalid_slot_never_signals() {
    let event = Event::new();
    let handles = [tether::RawHandle::INVALID, event.handle()];

    event.set();
    assert_eq!(wait_any_timeout(&handles, Duration::from_millis(10)), Some(1));
    assert_eq!(wait_any_timeout(&handles, Duration::from_millis(10)), None);
}

#[test]
fn test_wait_all_needs_every_handle() {
    let first = Event::manual();
    let second = Event::manual();
    let handles = [first.handle(), second.handle()];

    first.set();
    assert!(!wait_all_timeout(&handles, Duration::from_millis(20)));

    second.set();
    assert!(wait_all_timeout(&handles, Duration::from_millis(20)));
    wait_all(&handles);
}

#[test]
fn test_wait_all_consumes_auto_handles() {
    let first = Event::new();
    let second = Event::new();

    first.set();
    second.set();
    wait_all(&[first.handle(), second.handle()]);

    assert!(!is_signaled(first.handle()));
    assert!(!is_signaled(second.handle()));
}

#[test]
fn test_max_handles_accepted() {
    let events: Vec<Event> = (0..MAX_WAIT_HANDLES).map(|_| Event::new()).collect();
    let handles: Vec<_> = events.iter().map(Event::handle).collect();

    events[MAX_WAIT_HANDLES - 1].set();
    assert_eq!(wait_any(&handles), MAX_WAIT_HANDLES - 1);
}

#[test]
#[should_panic]
fn test_empty_wait_list_is_fatal() {
    set_fatal_action(FatalAction::Unwind);

    wait_any(&[]);
}

#[test]
#[should_panic]
fn test_oversized_wait_list_is_fatal() {
    set_fatal_action(FatalAction::Unwind);

    let event = Event::new();
    let handles = vec![event.handle(); MAX_WAIT_HANDLES + 1];
    wait_any(&handles);
}
