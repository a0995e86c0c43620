use std::sync::atomic::AtomicI64;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

/// The counter for one fixed-length time slice.
///
/// A bucket is handed out by [`WindowRing`](crate::WindowRing) and shared
/// between the ring, which recycles it for later slices, and the callers that
/// count events into it. Both fields are atomics, so concurrent increments and
/// reads never tear, but a caller that keeps a bucket across a slice rollover
/// will count into the new slice. Re-fetch it from the ring instead.
#[derive(Debug)]
pub struct Bucket {
    /// Start of the slice in milliseconds since the Unix epoch.
    window_start: AtomicI64,
    length_ms: i64,
    value: AtomicU64,
}

/// A plain copy of a [`Bucket`] taken at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketSnapshot {
    pub window_start: i64,
    pub value: u64,
}

impl Bucket {
    pub(crate) fn new(window_start: i64, length_ms: i64) -> Self {
        Self {
            window_start: AtomicI64::new(window_start),
            length_ms,
            value: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn window_start(&self) -> i64 {
        self.window_start.load(Ordering::Acquire)
    }

    /// Advances the slice this bucket represents.
    ///
    /// A start earlier than the current one is ignored: a bucket never moves
    /// backwards in time.
    pub fn set_window_start(&self, window_start: i64) {
        self.window_start.fetch_max(window_start, Ordering::AcqRel);
    }

    pub fn bucket_length_ms(&self) -> i64 {
        self.length_ms
    }

    #[inline]
    pub fn value(&self) -> u64 {
        self.value.load(Ordering::Acquire)
    }

    pub fn set_value(&self, value: u64) {
        self.value.store(value, Ordering::Release);
    }

    /// Adds `count` events and returns the new total.
    ///
    /// The counter wraps on overflow, as the underlying atomic does.
    #[inline]
    pub fn add(&self, count: u64) -> u64 {
        self.value
            .fetch_add(count, Ordering::AcqRel)
            .wrapping_add(count)
    }

    /// Counts a single event and returns the new total.
    #[inline]
    pub fn increment(&self) -> u64 {
        self.add(1)
    }

    /// Whether `timestamp_ms` falls inside this bucket's current slice.
    pub fn contains(&self, timestamp_ms: i64) -> bool {
        let start = self.window_start();
        // start is never negative, so the difference cannot overflow
        start <= timestamp_ms && timestamp_ms - start < self.length_ms
    }

    pub fn snapshot(&self) -> BucketSnapshot {
        BucketSnapshot {
            window_start: self.window_start(),
            value: self.value(),
        }
    }

    /// Reuses this bucket for a later slice.
    ///
    /// The counter is cleared before the new start is published so that a
    /// concurrent `sum` never credits old counts to the new slice.
    pub(crate) fn recycle(&self, window_start: i64) {
        self.set_value(0);
        self.set_window_start(window_start);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_counts_events() {
        let bucket = Bucket::new(1000, 500);

        assert_eq!(bucket.value(), 0);
        assert_eq!(bucket.increment(), 1);
        assert_eq!(bucket.add(4), 5);
        assert_eq!(bucket.value(), 5);

        bucket.set_value(42);
        assert_eq!(bucket.value(), 42);
    }

    #[test]
    fn it_wraps_a_saturated_counter() {
        let bucket = Bucket::new(0, 500);
        bucket.set_value(u64::MAX);

        assert_eq!(bucket.increment(), 0);
        assert_eq!(bucket.value(), 0);

        bucket.set_value(u64::MAX - 1);
        assert_eq!(bucket.add(3), 1);
    }

    #[test]
    fn it_never_moves_backwards() {
        let bucket = Bucket::new(1000, 500);

        bucket.set_window_start(1500);
        assert_eq!(bucket.window_start(), 1500);

        bucket.set_window_start(500);
        assert_eq!(bucket.window_start(), 1500);
    }

    #[test]
    fn it_resets_on_recycle() {
        let bucket = Bucket::new(0, 500);
        bucket.add(10);

        bucket.recycle(1500);

        assert_eq!(
            bucket.snapshot(),
            BucketSnapshot {
                window_start: 1500,
                value: 0
            }
        );
        assert_eq!(bucket.bucket_length_ms(), 500);
    }

    #[test]
    fn it_knows_its_slice() {
        let bucket = Bucket::new(1000, 500);

        assert!(!bucket.contains(999));
        assert!(bucket.contains(1000));
        assert!(bucket.contains(1499));
        assert!(!bucket.contains(1500));
    }
}
