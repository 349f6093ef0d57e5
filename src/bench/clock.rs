//! Monotonic time sources for the benchmark engine.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// A monotonic nanosecond counter.
pub trait Clock {
    /// Nanoseconds since an arbitrary, fixed origin.
    fn now_nanos(&self) -> u64;
}

/// Wall clock backed by `std::time::Instant`.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    #[inline(always)]
    fn now_nanos(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }
}

/// A clock that only moves when told to. Clones share the same time, so a
/// measured routine can advance the clock the engine reads.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, nanos: u64) {
        self.nanos.set(self.nanos.get().saturating_add(nanos));
    }

    pub fn set(&self, nanos: u64) {
        self.nanos.set(nanos);
    }
}

impl Clock for ManualClock {
    fn now_nanos(&self) -> u64 {
        self.nanos.get()
    }
}

/// One start/stop timing window.
pub struct Stopwatch<'a> {
    clock: &'a dyn Clock,
    start: u64,
}

impl<'a> Stopwatch<'a> {
    #[inline(always)]
    pub fn start(clock: &'a dyn Clock) -> Self {
        Stopwatch {
            clock,
            start: clock.now_nanos(),
        }
    }

    /// Elapsed nanoseconds since `start`.
    #[inline(always)]
    pub fn stop(&self) -> u64 {
        self.clock.now_nanos().saturating_sub(self.start)
    }
}
