use std::fmt::Debug;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use quanta::Instant;

use crate::WindowError;

/// Source of "now" for the wall-clock forms of the ring operations.
///
/// Implementors must be thread-safe: one ring is shared by every caller.
pub trait Clock: Debug + Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;
}

/// Wall clock backed by a [`quanta::Clock`].
///
/// The Unix time is read once at construction. After that, time advances by
/// the quanta clock, which is far cheaper to read on the hot path than
/// [`SystemTime`] and never jumps backwards.
#[derive(Debug, Clone)]
pub struct SystemClock {
    clock: quanta::Clock,
    /// A fixed point in time (TSC tick) to calculate deltas from.
    anchor: Instant,
    epoch_ms: i64,
}

impl SystemClock {
    pub fn new() -> Result<Self, WindowError> {
        Self::with_clock(quanta::Clock::new())
    }

    /// Anchors `clock` to the current Unix time.
    pub fn with_clock(clock: quanta::Clock) -> Result<Self, WindowError> {
        let epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| WindowError::Clock)?
            .as_millis() as i64;
        Ok(Self::anchored(clock, epoch_ms))
    }

    /// Anchors `clock` to an explicit Unix time, e.g. a mocked clock at 0.
    pub fn anchored(clock: quanta::Clock, epoch_ms: i64) -> Self {
        let anchor = clock.now();
        Self {
            clock,
            anchor,
            epoch_ms,
        }
    }
}

impl Clock for SystemClock {
    #[inline]
    fn now_ms(&self) -> i64 {
        let elapsed = self.clock.now().duration_since(self.anchor);
        self.epoch_ms + elapsed.as_millis() as i64
    }
}
