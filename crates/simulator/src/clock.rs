//! Monotonic wall-clock timer used for trace timestamps and real-time delays.

use std::time::{Duration, Instant};

/// Wall-clock source shared by the dispatcher and its I/O workers.
///
/// All timestamps reported through [`Clock::lap`] are seconds elapsed since
/// the clock was constructed (equivalently, since the simulation started).
pub struct Clock {
    origin: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Clock {
            origin: Instant::now(),
        }
    }

    /// Seconds elapsed since the clock was created, matching the
    /// `Time:%10.6f` precision the trace log renders.
    pub fn lap(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    /// Busy-waits for `millis` milliseconds of real wall-clock time. The
    /// simulator's timing fidelity depends on actually burning this much
    /// time rather than approximating it, so this polls `Instant` instead
    /// of trusting `thread::sleep`'s scheduler-dependent granularity.
    pub fn delay(&self, millis: u64) {
        let target = Duration::from_millis(millis);
        let start = Instant::now();
        while start.elapsed() < target {
            std::thread::yield_now();
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lap_is_monotonic() {
        let clock = Clock::new();
        let first = clock.lap();
        clock.delay(5);
        let second = clock.lap();
        assert!(second >= first);
    }

    #[test]
    fn delay_honors_minimum_duration() {
        let clock = Clock::new();
        let start = Instant::now();
        clock.delay(10);
        assert!(start.elapsed() >= Duration::from_millis(10));
    }
}
