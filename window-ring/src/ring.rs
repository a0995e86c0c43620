use std::sync::Arc;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use tracing::debug;
use tracing::warn;

use crate::Bucket;
use crate::BucketSnapshot;
use crate::Clock;
use crate::RetryPolicy;
use crate::SystemClock;
use crate::WindowConfig;
use crate::WindowError;
use crate::retry::Contention;

/// A fixed-size ring of [`Bucket`]s covering a sliding interval.
///
/// Time maps onto the ring linearly: slot `(t / bucket_length) % sample_count`
/// holds the bucket for the slice containing `t`, so the ring wraps around
/// once per interval. Slots are filled lazily and recycled in place once the
/// slice they hold has passed.
///
/// Installing a bucket into an empty slot is a single compare-and-swap.
/// Returning a bucket that is already current takes no lock at all. Only
/// recycling an old bucket, which mutates an object other callers may be
/// holding, goes through a ring-wide lock, and even then only via
/// `try_lock`: losers yield and retry according to the [`RetryPolicy`].
#[derive(Debug)]
pub struct WindowRing<C = SystemClock>
where
    C: Clock,
{
    bucket_length_ms: i64,
    sample_count: usize,
    interval_ms: i64,
    slots: Box<[ArcSwapOption<Bucket>]>,
    update_lock: Mutex<()>,
    retry: RetryPolicy,
    clock: C,
}

impl WindowRing<SystemClock> {
    /// Creates a ring of `sample_count` buckets spanning `interval_ms`, read
    /// against the system clock.
    ///
    /// # Errors
    ///
    /// Fails if either argument is not positive or `interval_ms` does not
    /// split evenly into `sample_count` buckets.
    pub fn new(sample_count: usize, interval_ms: i64) -> Result<Self, WindowError> {
        let config = WindowConfig::new(sample_count, interval_ms);
        config.validate()?;
        Self::with_config(config, SystemClock::new()?)
    }
}

impl<C> WindowRing<C>
where
    C: Clock,
{
    pub fn with_config(config: WindowConfig, clock: C) -> Result<Self, WindowError> {
        config.validate()?;
        let bucket_length_ms = config.bucket_length_ms();
        let slots = (0..config.sample_count)
            .map(|_| ArcSwapOption::empty())
            .collect();

        debug!(
            sample_count = config.sample_count,
            interval_ms = config.interval_ms,
            bucket_length_ms,
            retry = ?config.retry,
            "created window ring"
        );

        Ok(Self {
            bucket_length_ms,
            sample_count: config.sample_count,
            interval_ms: config.interval_ms,
            slots,
            update_lock: Mutex::new(()),
            retry: config.retry,
            clock,
        })
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn interval_ms(&self) -> i64 {
        self.interval_ms
    }

    pub fn interval_secs(&self) -> f64 {
        self.interval_ms as f64 / 1000.0
    }

    pub fn bucket_length_ms(&self) -> i64 {
        self.bucket_length_ms
    }

    /// The slot that `now_ms` maps onto.
    #[inline]
    pub fn slot_index(&self, now_ms: i64) -> usize {
        (now_ms.div_euclid(self.bucket_length_ms) % self.sample_count as i64) as usize
    }

    /// The start of the slice containing `now_ms`.
    #[inline]
    pub fn slice_start(&self, now_ms: i64) -> i64 {
        now_ms - now_ms.rem_euclid(self.bucket_length_ms)
    }

    /// Whether `bucket` is too old to count towards a sum taken at `now_ms`.
    ///
    /// A bucket is fresh for one bucket length past its start, so the
    /// previous slice still counts exactly on a slice boundary.
    #[inline]
    pub fn is_stale(&self, now_ms: i64, bucket: &Bucket) -> bool {
        now_ms.saturating_sub(bucket.window_start()) > self.bucket_length_ms
    }

    /// The bucket for the current wall-clock time.
    pub fn current_bucket(&self) -> Option<Arc<Bucket>> {
        self.current_bucket_at(self.clock.now_ms())
    }

    /// The strict form of [`WindowRing::current_bucket`].
    pub fn try_current_bucket(&self) -> Result<Arc<Bucket>, WindowError> {
        self.try_current_bucket_at(self.clock.now_ms())
    }

    /// The bucket for the slice containing `now_ms`.
    ///
    /// This never fails loudly: a negative timestamp or an exhausted bounded
    /// retry policy yields `None`, and the caller must check for it. Use
    /// [`WindowRing::try_current_bucket_at`] to see why.
    #[inline]
    pub fn current_bucket_at(&self, now_ms: i64) -> Option<Arc<Bucket>> {
        self.try_current_bucket_at(now_ms).ok()
    }

    /// The bucket for the slice containing `now_ms`, creating or recycling
    /// the slot's bucket as required.
    ///
    /// If the slot already holds a later slice than `now_ms` (the callers'
    /// clocks disagree), a detached bucket is returned. Counts added to it
    /// are never summed.
    ///
    /// # Errors
    ///
    /// - [`WindowError::NegativeTimestamp`] if `now_ms` is negative.
    /// - [`WindowError::Contended`] if a bounded retry policy gives up.
    pub fn try_current_bucket_at(&self, now_ms: i64) -> Result<Arc<Bucket>, WindowError> {
        if now_ms < 0 {
            return Err(WindowError::NegativeTimestamp(now_ms));
        }
        let idx = self.slot_index(now_ms);
        let slice_start = self.slice_start(now_ms);
        let slot = &self.slots[idx];
        let mut contention = Contention::new(self.retry);

        loop {
            {
                let current = slot.load();
                match &*current {
                    None => {
                        let fresh = Arc::new(Bucket::new(slice_start, self.bucket_length_ms));
                        let previous = slot.compare_and_swap(&current, Some(Arc::clone(&fresh)));
                        if previous.is_none() {
                            return Ok(fresh);
                        }
                    }
                    Some(bucket) if bucket.window_start() == slice_start => {
                        return Ok(Arc::clone(bucket));
                    }
                    Some(bucket) if bucket.window_start() < slice_start => {
                        if let Some(_guard) = self.update_lock.try_lock() {
                            // Another caller may have recycled it since we looked.
                            let window_start = bucket.window_start();
                            if window_start <= slice_start {
                                if window_start < slice_start {
                                    debug!(
                                        slot = idx,
                                        from = window_start,
                                        to = slice_start,
                                        "recycled bucket"
                                    );
                                    bucket.recycle(slice_start);
                                }
                                return Ok(Arc::clone(bucket));
                            }
                        }
                    }
                    Some(bucket) => {
                        warn!(
                            slot = idx,
                            window_start = bucket.window_start(),
                            slice_start,
                            "slot holds a later slice, handing out a detached bucket"
                        );
                        return Ok(Arc::new(Bucket::new(slice_start, self.bucket_length_ms)));
                    }
                }
            }

            if let Err(err) = contention.back_off() {
                warn!(slot = idx, slice_start, %err, "giving up on contended slot");
                return Err(err);
            }
        }
    }

    /// The approximate event count over the window ending now.
    pub fn sum(&self) -> Result<u64, WindowError> {
        self.sum_at(self.clock.now_ms())
    }

    /// The approximate event count over the window ending at `now_ms`.
    ///
    /// Empty and stale slots are skipped. No snapshot is taken, so buckets
    /// incremented or recycled meanwhile may or may not be reflected.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::NegativeTimestamp`] if `now_ms` is negative.
    pub fn sum_at(&self, now_ms: i64) -> Result<u64, WindowError> {
        if now_ms < 0 {
            return Err(WindowError::NegativeTimestamp(now_ms));
        }
        let total = self
            .slots
            .iter()
            .filter_map(|slot| {
                slot.load()
                    .as_deref()
                    .filter(|bucket| !self.is_stale(now_ms, bucket))
                    .map(|bucket| bucket.value())
            })
            .fold(0, u64::saturating_add);
        Ok(total)
    }

    /// Copies of every fresh bucket as of now, oldest first.
    pub fn live_buckets(&self) -> Result<Vec<BucketSnapshot>, WindowError> {
        self.live_buckets_at(self.clock.now_ms())
    }

    /// Copies of every bucket that [`WindowRing::sum_at`] would count at
    /// `now_ms`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::NegativeTimestamp`] if `now_ms` is negative.
    pub fn live_buckets_at(&self, now_ms: i64) -> Result<Vec<BucketSnapshot>, WindowError> {
        if now_ms < 0 {
            return Err(WindowError::NegativeTimestamp(now_ms));
        }
        let mut live: Vec<BucketSnapshot> = self
            .slots
            .iter()
            .filter_map(|slot| {
                slot.load()
                    .as_deref()
                    .filter(|bucket| !self.is_stale(now_ms, bucket))
                    .map(|bucket| bucket.snapshot())
            })
            .collect();
        live.sort_unstable_by_key(|snapshot| snapshot.window_start);
        Ok(live)
    }

    #[cfg(test)]
    pub(crate) fn update_lock(&self) -> &Mutex<()> {
        &self.update_lock
    }
}
