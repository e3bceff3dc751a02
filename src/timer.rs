//! Wall-clock timestamps bracketing a timed loop
//!
//! Timestamps are `CLOCK_REALTIME` readings truncated to microseconds. The
//! elapsed time is computed as one signed microsecond difference so a negative
//! sub-second delta never wraps an unsigned value.

use nix::time::{clock_gettime, ClockId};
use serde::Serialize;
use std::fmt;

/// A wall-clock reading in seconds + microseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Timestamp {
    pub secs: i64,
    pub micros: i64,
}

impl Timestamp {
    /// Read the realtime clock
    pub fn now() -> Self {
        match clock_gettime(ClockId::CLOCK_REALTIME) {
            Ok(ts) => Self {
                secs: ts.tv_sec() as i64,
                micros: ts.tv_nsec() as i64 / 1_000,
            },
            // CLOCK_REALTIME is always present; keep a sane reading anyway
            Err(_) => Self::from_system_time(),
        }
    }

    fn from_system_time() -> Self {
        let since_epoch = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            secs: since_epoch.as_secs() as i64,
            micros: i64::from(since_epoch.subsec_micros()),
        }
    }

    /// Microseconds from `self` to `later`; 0 if the clock stepped backwards
    ///
    /// # Example
    /// ```
    /// use sysperf::timer::Timestamp;
    ///
    /// let begin = Timestamp { secs: 10, micros: 999_900 };
    /// let end = Timestamp { secs: 11, micros: 100 };
    /// assert_eq!(begin.micros_until(&end), 200);
    /// ```
    pub fn micros_until(&self, later: &Timestamp) -> u64 {
        let diff = (i128::from(later.secs) - i128::from(self.secs)) * 1_000_000
            + (i128::from(later.micros) - i128::from(self.micros));
        if diff < 0 {
            tracing::warn!("wall clock went backwards by {}us", -diff);
            return 0;
        }
        u64::try_from(diff).unwrap_or(u64::MAX)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}", self.secs, self.micros)
    }
}

/// Begin/end pair around one timed window
#[derive(Debug, Default)]
pub struct Stopwatch {
    begin: Option<Timestamp>,
    end: Option<Timestamp>,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        let now = Timestamp::now();
        tracing::debug!("begin time: {}", now);
        self.begin = Some(now);
        self.end = None;
    }

    pub fn stop(&mut self) {
        let now = Timestamp::now();
        tracing::debug!("end time: {}", now);
        self.end = Some(now);
    }

    /// Elapsed microseconds of a completed window
    pub fn elapsed_micros(&self) -> Option<u64> {
        match (self.begin, self.end) {
            (Some(begin), Some(end)) => Some(begin.micros_until(&end)),
            _ => None,
        }
    }

    /// Time `f`, returning its output and the elapsed microseconds
    pub fn time<F, R>(f: F) -> (R, u64)
    where
        F: FnOnce() -> R,
    {
        let mut watch = Self::new();
        watch.start();
        let result = f();
        watch.stop();
        (result, watch.elapsed_micros().unwrap_or_default())
    }
}
