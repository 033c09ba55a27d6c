use rig_traits::Timestamp;
use std::cell::Cell;
use std::rc::Rc;
#[cfg(not(unix))]
use std::sync::OnceLock;
use std::time::Duration;
#[cfg(not(unix))]
use std::time::Instant;

pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// The system monotonic clock (`CLOCK_MONOTONIC` on unix).
///
/// Readings are shared by every process on the host, so a second run into the
/// same output directory continues where the first left off instead of
/// restarting at zero. Never affected by wall-clock changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_duration(system_monotonic())
    }
}

#[cfg(unix)]
fn system_monotonic() -> Duration {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: `ts` is a valid, writable timespec for the duration of the call.
    let rc = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
    if rc != 0 {
        tracing::warn!(
            "clock_gettime(CLOCK_MONOTONIC) failed: {}",
            std::io::Error::last_os_error()
        );
        return Duration::ZERO;
    }
    Duration::new(ts.tv_sec as u64, ts.tv_nsec as u32)
}

// Falls back to process-relative time where there is no shared monotonic clock.
#[cfg(not(unix))]
fn system_monotonic() -> Duration {
    static ORIGIN: OnceLock<Instant> = OnceLock::new();
    ORIGIN.get_or_init(Instant::now).elapsed()
}

/// Hand-driven clock. Clones share the same time, so a test can keep a handle
/// while the logger owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
    tick: Duration,
}

impl ManualClock {
    pub fn new(start: Duration) -> Self {
        ManualClock {
            now: Rc::new(Cell::new(start)),
            tick: Duration::ZERO,
        }
    }

    /// Advances by `tick` after every reading.
    pub fn ticking(start: Duration, tick: Duration) -> Self {
        ManualClock {
            now: Rc::new(Cell::new(start)),
            tick,
        }
    }

    pub fn set(&self, now: Duration) {
        self.now.set(now);
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        let now = self.now.get();
        self.now.set(now + self.tick);
        Timestamp::from_duration(now)
    }
}
