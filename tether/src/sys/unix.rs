use libc::{
    CLD_EXITED, CLOCK_MONOTONIC, EFD_CLOEXEC, EFD_NONBLOCK, POLLERR, POLLHUP, POLLIN, POLLNVAL,
    SYS_pidfd_open, TFD_CLOEXEC, TFD_NONBLOCK, WEXITED, WNOHANG, WNOWAIT, c_int, c_long, c_short,
    eventfd, idtype_t, itimerspec, nfds_t, pid_t, poll, pollfd, read, siginfo_t, syscall,
    timerfd_create, timerfd_settime, timespec, waitid, write,
};
use std::os::fd::{FromRawFd, OwnedFd, RawFd};
use std::time::Duration;
use std::{io, mem};

/// `waitid` selector for pidfds (`P_PIDFD`, Linux >= 5.4).
const P_PIDFD: idtype_t = 3;

/// Readiness bits that count as "signaled" for a polled descriptor.
pub(crate) const READY: c_short = POLLIN | POLLHUP | POLLERR;

/// Outcome of a non-reaping `waitid` on a pidfd.
pub(crate) enum ChildStatus {
    Running,
    Exited(i32),
    Signaled(i32),
}

fn owned(fd: c_int) -> io::Result<OwnedFd> {
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }

    // SAFETY: `fd` was just returned by the kernel and is owned by nobody else.
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

/// Creates a non-blocking, close-on-exec `eventfd` with a zero counter.
pub(crate) fn sys_eventfd() -> io::Result<OwnedFd> {
    owned(unsafe { eventfd(0, EFD_NONBLOCK | EFD_CLOEXEC) })
}

/// Adds one to an eventfd counter, making it readable.
///
/// A saturated counter (`EAGAIN`) is already signaled and is not an error.
pub(crate) fn sys_counter_signal(fd: RawFd) -> io::Result<()> {
    let one: u64 = 1;
    let rc = unsafe { write(fd, &one as *const u64 as *const _, mem::size_of::<u64>()) };

    if rc < 0 {
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::WouldBlock {
            return Err(err);
        }
    }

    Ok(())
}

/// Reads (and thereby clears) an eventfd or timerfd counter.
///
/// Returns `Ok(false)` when the counter was already zero.
pub(crate) fn sys_counter_drain(fd: RawFd) -> io::Result<bool> {
    let mut value: u64 = 0;

    loop {
        let rc = unsafe { read(fd, &mut value as *mut u64 as *mut _, mem::size_of::<u64>()) };
        if rc >= 0 {
            return Ok(true);
        }

        let err = io::Error::last_os_error();
        match err.kind() {
            io::ErrorKind::WouldBlock => return Ok(false),
            io::ErrorKind::Interrupted => continue,
            _ => return Err(err),
        }
    }
}

/// Opens a pidfd referring to `pid`.
pub(crate) fn sys_pidfd_open(pid: pid_t) -> io::Result<OwnedFd> {
    let rc: c_long = unsafe { syscall(SYS_pidfd_open, pid, 0) };
    owned(rc as c_int)
}

/// Queries a child's exit status through its pidfd without reaping it.
pub(crate) fn sys_pidfd_status(fd: RawFd) -> io::Result<ChildStatus> {
    let mut info: siginfo_t = unsafe { mem::zeroed() };

    let rc = unsafe {
        waitid(
            P_PIDFD,
            fd as libc::id_t,
            &mut info,
            WEXITED | WNOHANG | WNOWAIT,
        )
    };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }

    // SAFETY: `waitid` filled `info` for a child state change (or left it zeroed).
    let (pid, status) = unsafe { (info.si_pid(), info.si_status()) };

    if pid == 0 {
        Ok(ChildStatus::Running)
    } else if info.si_code == CLD_EXITED {
        Ok(ChildStatus::Exited(status))
    } else {
        Ok(ChildStatus::Signaled(status))
    }
}

/// Creates a non-blocking monotonic `timerfd`.
pub(crate) fn sys_timerfd() -> io::Result<OwnedFd> {
    owned(unsafe { timerfd_create(CLOCK_MONOTONIC, TFD_NONBLOCK | TFD_CLOEXEC) })
}

fn to_timespec(duration: Duration) -> timespec {
    let mut spec: timespec = unsafe { mem::zeroed() };
    spec.tv_sec = duration.as_secs() as libc::time_t;
    spec.tv_nsec = duration.subsec_nanos() as _;
    spec
}

/// Arms a timerfd. A zero `initial` disarms it.
pub(crate) fn sys_timerfd_set(fd: RawFd, initial: Duration, interval: Duration) -> io::Result<()> {
    let mut spec: itimerspec = unsafe { mem::zeroed() };
    spec.it_value = to_timespec(initial);
    spec.it_interval = to_timespec(interval);

    let rc = unsafe { timerfd_settime(fd, 0, &spec, std::ptr::null_mut()) };
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Converts an optional timeout into `poll(2)` milliseconds, rounding up.
fn poll_timeout(timeout: Option<Duration>) -> c_int {
    match timeout {
        None => -1,
        Some(t) => {
            let mut ms = t.as_millis();
            if Duration::from_millis(ms as u64) < t {
                ms += 1;
            }
            ms.min(c_int::MAX as u128) as c_int
        }
    }
}

/// Polls `fds` for readability.
///
/// Returns the number of descriptors with non-zero `revents`; `0` means
/// the timeout elapsed. `EINTR` is surfaced to the caller, which owns the
/// deadline bookkeeping.
pub(crate) fn sys_poll(fds: &mut [pollfd], timeout: Option<Duration>) -> io::Result<usize> {
    let rc = unsafe { poll(fds.as_mut_ptr(), fds.len() as nfds_t, poll_timeout(timeout)) };

    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(rc as usize)
    }
}

/// Builds a `pollfd` waiting for readability on `fd`.
pub(crate) fn poll_entry(fd: RawFd) -> pollfd {
    pollfd {
        fd,
        events: POLLIN,
        revents: 0,
    }
}

/// Returns `true` if the kernel rejected the descriptor as invalid.
pub(crate) fn is_invalid(entry: &pollfd) -> bool {
    entry.revents & POLLNVAL != 0
}
