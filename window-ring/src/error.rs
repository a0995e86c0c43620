/// Errors produced by a [`WindowRing`](crate::WindowRing).
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    /// The ring was configured without any slots.
    #[error("Bucket count must be positive, got {0}")]
    InvalidSampleCount(usize),

    /// The total tracked interval was zero or negative.
    #[error("Total interval of the sliding window must be positive, got {0}ms")]
    InvalidInterval(i64),

    /// The interval cannot be split into equally sized buckets.
    #[error("Interval of {interval_ms}ms is not divisible into {sample_count} buckets")]
    IndivisibleInterval {
        interval_ms: i64,
        sample_count: usize,
    },

    /// A timestamp before the Unix epoch was supplied.
    ///
    /// Only the strict operations report this. [`WindowRing::current_bucket_at`]
    /// returns `None` instead.
    ///
    /// [`WindowRing::current_bucket_at`]: crate::WindowRing::current_bucket_at
    #[error("Timestamp {0}ms is not valid")]
    NegativeTimestamp(i64),

    /// A bounded [`RetryPolicy`](crate::RetryPolicy) ran out of attempts while
    /// racing other callers for a slot.
    #[error("Slot still contended after {attempts} attempts")]
    Contended {
        /// The number of failed attempts.
        attempts: u32,
    },

    /// The system clock reports a time before the Unix epoch.
    #[error("System clock is set before the Unix epoch")]
    Clock,
}
