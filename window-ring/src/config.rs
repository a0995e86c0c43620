//! Configuration types for the window ring

use std::num::NonZeroU32;
use std::time::Duration;

use crate::WindowError;

/// How a caller racing others for a slot waits before trying again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    /// Yield and retry until the slot settles, however long that takes.
    ///
    /// Under heavy contention a caller can starve.
    #[default]
    Unbounded,

    /// Give up with [`WindowError::Contended`] after `max_attempts` failures.
    ///
    /// The first retry only yields; later ones sleep, doubling from
    /// `base_backoff` up to `max_backoff`.
    Bounded {
        max_attempts: NonZeroU32,
        base_backoff: Duration,
        max_backoff: Duration,
    },
}

impl RetryPolicy {
    /// A bounded policy with microsecond-scale backoff.
    pub fn bounded(max_attempts: NonZeroU32) -> Self {
        Self::Bounded {
            max_attempts,
            base_backoff: Duration::from_micros(1),
            max_backoff: Duration::from_millis(1),
        }
    }
}

/// Configuration for a [`WindowRing`](crate::WindowRing)
#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub(crate) sample_count: usize,
    pub(crate) interval_ms: i64,
    pub(crate) retry: RetryPolicy,
}

impl WindowConfig {
    /// Split `interval_ms` into `sample_count` buckets, retrying without bound
    pub fn new(sample_count: usize, interval_ms: i64) -> Self {
        Self {
            sample_count,
            interval_ms,
            retry: RetryPolicy::default(),
        }
    }

    /// Builder-style: set the number of buckets
    pub fn sample_count(mut self, sample_count: usize) -> Self {
        self.sample_count = sample_count;
        self
    }

    /// Builder-style: set the total tracked interval
    pub fn interval_ms(mut self, interval_ms: i64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    /// Builder-style: set the contention retry policy
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), WindowError> {
        if self.sample_count == 0 {
            return Err(WindowError::InvalidSampleCount(self.sample_count));
        }
        if self.interval_ms <= 0 {
            return Err(WindowError::InvalidInterval(self.interval_ms));
        }
        let divisible = i64::try_from(self.sample_count)
            .is_ok_and(|samples| self.interval_ms % samples == 0);
        if !divisible {
            return Err(WindowError::IndivisibleInterval {
                interval_ms: self.interval_ms,
                sample_count: self.sample_count,
            });
        }
        Ok(())
    }

    /// Length of one bucket. Only meaningful once validated.
    pub(crate) fn bucket_length_ms(&self) -> i64 {
        self.interval_ms / self.sample_count as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_rejects_zero_sample_count() {
        let result = WindowConfig::new(0, 1000).validate();
        assert!(matches!(result, Err(WindowError::InvalidSampleCount(0))));
    }

    #[test]
    fn config_rejects_non_positive_interval() {
        assert!(matches!(
            WindowConfig::new(2, -1000).validate(),
            Err(WindowError::InvalidInterval(-1000))
        ));
        assert!(matches!(
            WindowConfig::new(2, 0).validate(),
            Err(WindowError::InvalidInterval(0))
        ));
    }

    #[test]
    fn config_rejects_indivisible_interval() {
        let result = WindowConfig::new(3, 1000).validate();
        assert_eq!(
            result,
            Err(WindowError::IndivisibleInterval {
                interval_ms: 1000,
                sample_count: 3
            })
        );
    }

    #[test]
    fn config_rejects_more_buckets_than_milliseconds() {
        let result = WindowConfig::new(2000, 1000).validate();
        assert!(matches!(
            result,
            Err(WindowError::IndivisibleInterval { .. })
        ));
    }

    #[test]
    fn config_accepts_valid_parameters() {
        let config = WindowConfig::new(3, 1500);
        assert!(config.validate().is_ok());
        assert_eq!(config.bucket_length_ms(), 500);
    }

    #[test]
    fn config_builder_pattern_works() {
        let attempts = NonZeroU32::new(4).unwrap();
        let config = WindowConfig::new(0, 0)
            .sample_count(2)
            .interval_ms(1000)
            .retry(RetryPolicy::bounded(attempts));

        assert!(config.validate().is_ok());
        assert_eq!(config.bucket_length_ms(), 500);
        assert_eq!(
            config.retry,
            RetryPolicy::Bounded {
                max_attempts: attempts,
                base_backoff: Duration::from_micros(1),
                max_backoff: Duration::from_millis(1),
            }
        );
    }

    #[test]
    fn retry_defaults_to_unbounded() {
        assert_eq!(WindowConfig::new(2, 1000).retry, RetryPolicy::Unbounded);
    }
}
