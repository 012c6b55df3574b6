//! Waitable timers.

use crate::error::OrFatal;
use crate::handle::{OwnedHandle, RawHandle, Reset};
use crate::sys;

use std::os::fd::AsRawFd;
use std::time::{Duration, Instant};

/// Lifecycle of a [`Timer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerState {
    /// Not armed.
    Inactive,

    /// Armed and counting.
    Active,

    /// Disarmed by [`Timer::pause`]; [`Timer::reactivate`] resumes it.
    Paused,
}

/// A waitable timer backed by a `timerfd`.
///
/// The handle is signaled once `delay` has elapsed after
/// [`activate`](Self::activate) and then every `period` (a zero period
/// makes a one-shot timer). The handle is auto-reset: the wait that
/// observes an expiration consumes it.
///
/// Pausing remembers how far into the schedule the timer was, so
/// [`reactivate`](Self::reactivate) continues with the same phase instead
/// of restarting the delay.
#[derive(Debug)]
pub struct Timer {
    handle: OwnedHandle,
    period: Duration,
    delay: Duration,
    activated_at: Instant,
    paused_at: Instant,
    state: TimerState,
}

impl Timer {
    /// Creates an inactive timer.
    pub fn new() -> Self {
        let fd = sys::sys_timerfd().or_fatal("timerfd_create");
        let now = Instant::now();

        Self {
            handle: OwnedHandle::new(fd, Reset::Auto),
            period: Duration::ZERO,
            delay: Duration::ZERO,
            activated_at: now,
            paused_at: now,
            state: TimerState::Inactive,
        }
    }

    /// Arms the timer: first expiration after `delay`, then every `period`.
    pub fn activate(&mut self, period: Duration, delay: Duration) {
        self.period = period;
        self.delay = delay;

        // A zero initial value disarms a timerfd; fire as soon as possible instead.
        let initial = delay.max(Duration::from_nanos(1));
        sys::sys_timerfd_set(self.handle.as_raw_fd(), initial, period).or_fatal("timerfd_settime");

        self.activated_at = Instant::now();
        self.state = TimerState::Active;
    }

    /// Disarms the timer.
    pub fn inactivate(&mut self) {
        if self.state == TimerState::Active {
            self.disarm();
        }
        self.state = TimerState::Inactive;
    }

    /// Disarms an active timer, remembering its phase.
    pub fn pause(&mut self) {
        if self.state == TimerState::Active {
            self.paused_at = Instant::now();
            self.disarm();
            self.state = TimerState::Paused;
        }
    }

    /// Re-arms a paused timer where it left off.
    ///
    /// A paused one-shot timer whose delay had already elapsed stays
    /// disarmed.
    pub fn reactivate(&mut self) {
        if self.state != TimerState::Paused {
            return;
        }

        let elapsed = self.paused_at.duration_since(self.activated_at);

        if self.period.is_zero() {
            if elapsed < self.delay {
                self.activate(Duration::ZERO, self.delay - elapsed);
            } else {
                self.state = TimerState::Inactive;
            }
        } else if elapsed < self.delay {
            self.activate(self.period, self.delay - elapsed);
        } else {
            let into_period = (elapsed - self.delay).as_nanos() % self.period.as_nanos();
            let remaining = self.period - duration_from_nanos(into_period);

            self.activate(self.period, remaining);
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> TimerState {
        self.state
    }

    /// Returns the waitable handle of this timer.
    pub fn handle(&self) -> RawHandle {
        self.handle.raw()
    }

    fn disarm(&self) {
        sys::sys_timerfd_set(self.handle.as_raw_fd(), Duration::ZERO, Duration::ZERO)
            .or_fatal("timerfd_settime");
    }
}

/// Converts a nanosecond count below some `Duration` back into one.
fn duration_from_nanos(nanos: u128) -> Duration {
    const NANOS_PER_SEC: u128 = 1_000_000_000;

    let secs = u64::try_from(nanos / NANOS_PER_SEC).unwrap_or(u64::MAX);
    Duration::new(secs, (nanos % NANOS_PER_SEC) as u32)
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
