//! # window-ring
//!
//! `window-ring` counts events over a sliding time window using a fixed ring
//! of time buckets. It is the measurement half of an admission controller:
//! callers count each request into the current bucket, and a policy compares
//! the windowed [`sum`](WindowRing::sum) against its threshold.
//!
//! ## Core Philosophy
//!
//! Counting must be cheap on the request path. Fetching the current bucket is
//! a single atomic load when the bucket is already current, and a single
//! Compare-And-Swap when a slot is touched for the first time. Only recycling
//! a bucket whose slice has passed takes a lock, and that lock is only ever
//! tried, never waited on.
//!
//! ## Key Concepts
//!
//! * **Bucket**: the counter for one fixed-length slice of time.
//! * **Slot**: a position in the ring that successive slices take turns
//!   occupying, `interval` apart.
//! * **Stale**: a bucket older than one bucket length no longer counts towards
//!   the sum, even before its slot is recycled.
//! * **Approximate**: sums are not snapshots. Buckets may be incremented or
//!   recycled while they are being read.
//!
//! ## Example
//!
//! ```rust
//! use window_ring::WindowRing;
//!
//! // Three 500ms buckets covering 1.5s.
//! let ring = WindowRing::new(3, 1500).unwrap();
//!
//! for _ in 0..10 {
//!     if let Some(bucket) = ring.current_bucket_at(1250) {
//!         bucket.increment();
//!     }
//! }
//! assert_eq!(ring.sum_at(1250).unwrap(), 10);
//!
//! // Nothing counted in the last interval.
//! assert_eq!(ring.sum_at(5000).unwrap(), 0);
//! ```

mod bucket;
mod clock;
mod config;
mod error;
mod retry;
mod ring;


pub use bucket::Bucket;
pub use bucket::BucketSnapshot;
pub use clock::Clock;
pub use clock::SystemClock;
pub use config::RetryPolicy;
pub use config::WindowConfig;
pub use error::WindowError;
pub use ring::WindowRing;
