use std::thread;

use tracing::trace;

use crate::RetryPolicy;
use crate::WindowError;

/// Tracks failed attempts at one slot and waits between them.
#[derive(Debug)]
pub(crate) struct Contention {
    policy: RetryPolicy,
    attempts: u32,
}

impl Contention {
    pub(crate) fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
        }
    }

    /// Records a failed attempt and waits before the next one.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::Contended`] once a bounded policy is exhausted.
    pub(crate) fn back_off(&mut self) -> Result<(), WindowError> {
        self.attempts = self.attempts.saturating_add(1);
        trace!(attempts = self.attempts, "slot contended, retrying");

        match self.policy {
            RetryPolicy::Unbounded => thread::yield_now(),
            RetryPolicy::Bounded {
                max_attempts,
                base_backoff,
                max_backoff,
            } => {
                if self.attempts >= max_attempts.get() {
                    return Err(WindowError::Contended {
                        attempts: self.attempts,
                    });
                }
                if self.attempts == 1 {
                    thread::yield_now();
                } else {
                    let doublings = (self.attempts - 2).min(16);
                    let delay = base_backoff
                        .saturating_mul(1 << doublings)
                        .min(max_backoff);
                    thread::sleep(delay);
                }
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn attempts(&self) -> u32 {
        self.attempts
    }
}
