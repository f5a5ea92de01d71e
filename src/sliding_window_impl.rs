//! Sliding window -type limiter

use core::time::Duration;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

use crate::macros::std_time_provider;
use crate::{BucketRing, ExceededLimit, Limiter, LimiterResult};

/// Bucket count used by [`sliding_window`]
pub const DEFAULT_BUCKET_COUNT: usize = 10;

/// Bucket width used by [`sliding_window`]
pub const DEFAULT_BUCKET_INTERVAL: Duration = Duration::from_millis(100);

/// Build a sliding window limiter with the default bucket layout
///
/// The window consists of [`DEFAULT_BUCKET_COUNT`] buckets of
/// [`DEFAULT_BUCKET_INTERVAL`] each, i.e. one second in total.
///
/// # Arguments
/// * `max_per_window` - how many requests are admitted during a single window
pub fn sliding_window(
    max_per_window: u64,
) -> SlidingWindow<impl Fn() -> Duration, DEFAULT_BUCKET_COUNT> {
    sliding_window_with_interval::<DEFAULT_BUCKET_COUNT>(max_per_window, DEFAULT_BUCKET_INTERVAL)
}

/// Build a sliding window limiter with a custom bucket layout
///
/// Bucket count is defined by the generic argument `N: usize`
///
/// # Arguments
/// * `capacity` - how many requests are admitted during a single window
/// * `bucket_interval` - time span covered by one bucket
pub fn sliding_window_with_interval<const N: usize>(
    capacity: u64,
    bucket_interval: Duration,
) -> SlidingWindow<impl Fn() -> Duration, N> {
    SlidingWindow::new_with_time_provider(
        SlidingWindowConfig::new(capacity, bucket_interval),
        std_time_provider!(),
    )
}

/// Configuration for a sliding window limiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlidingWindowConfig {
    capacity: u64,
    bucket_interval: Duration,
}

impl SlidingWindowConfig {
    /// # Arguments
    /// * `capacity` - maximum total across all buckets
    /// * `bucket_interval` - time span covered by one bucket
    pub const fn new(capacity: u64, bucket_interval: Duration) -> Self {
        Self {
            capacity,
            bucket_interval,
        }
    }

    /// Maximum total across all buckets
    pub const fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Time span covered by one bucket
    pub const fn bucket_interval(&self) -> Duration {
        self.bucket_interval
    }
}

/// Sliding window -type rate limiter
///
/// The window is divided into `N` buckets held in a [`BucketRing`].
/// Every admission first rolls the ring forward to the present,
/// clearing buckets the window has moved past, then compares the
/// ring total against the capacity and finally records the request
/// in the bucket for "now".
///
/// Roll, check and record run under a single mutex, so two requests
/// can never both observe a total just below the capacity and both
/// get admitted. The clock is read once per call, inside the lock.
///
/// # Generic arguments
/// * `T` - clock closure
/// * `N` - number of buckets
///
/// # Notes
/// Accuracy is bounded by the bucket width: requests are grouped per
/// bucket rather than tracked by individual timestamp.
pub struct SlidingWindow<T, const N: usize>
where
    T: Fn() -> Duration,
{
    config: SlidingWindowConfig,
    time_provider: T,
    state: Mutex<WindowState<N>>,
}

impl<T, const N: usize> SlidingWindow<T, N>
where
    T: Fn() -> Duration,
{
    /// Initialize a new sliding window limiter utilizing the given timer
    ///
    /// # Arguments
    /// * `config` - capacity and bucket width
    /// * `time_provider` - closure that returns a monotonically nondecreasing
    ///   timestamp as [`Duration`] from some fixed epoch in the past
    ///
    /// # Panics
    /// Panics if the bucket interval is zero.
    ///
    /// # Notes
    /// * If you are developing for a `std` target, you probably wish to use [`sliding_window`]
    /// * Bucket count is defined by the generic argument `N: usize`
    pub fn new_with_time_provider(config: SlidingWindowConfig, time_provider: T) -> Self {
        assert!(
            !config.bucket_interval.is_zero(),
            "bucket interval must be greater than zero"
        );

        let time_now = time_provider();
        Self {
            config,
            time_provider,
            state: Mutex::new(WindowState::new(time_now)),
        }
    }

    /// Capacity and bucket width this limiter was built with
    pub fn config(&self) -> &SlidingWindowConfig {
        &self.config
    }

    /// Total time span covered by all buckets
    pub fn window(&self) -> Duration {
        let buckets = u32::try_from(N).unwrap_or(u32::MAX);
        self.config.bucket_interval.saturating_mul(buckets)
    }

    /// Number of requests currently counted in the window
    pub fn count(&self) -> u64 {
        let mut state = self.lock();
        let now = (self.time_provider)();
        state.roll_forward(now, self.config.bucket_interval);
        state.ring.sum()
    }

    /// How many more requests the window would admit right now
    pub fn remaining(&self) -> u64 {
        self.config.capacity.saturating_sub(self.count())
    }

    fn lock(&self) -> MutexGuard<'_, WindowState<N>> {
        // Every mutation leaves the state consistent, so a poisoned lock is safe to reuse
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T, const N: usize> Limiter for SlidingWindow<T, N>
where
    T: Fn() -> Duration,
{
    fn try_consume(&self, tokens: u64) -> LimiterResult {
        if tokens == 0 {
            return Ok(());
        }

        let mut state = self.lock();
        let now = (self.time_provider)();
        state.admit(now, tokens, &self.config)
    }
}

/// Mutable part of the limiter, guarded by the mutex
struct WindowState<const N: usize> {
    ring: BucketRing<N>,
    /// Start of the bucket at logical index 0
    window_start: Duration,
    /// Latest clock reading seen by a roll, never behind `window_start`
    last_roll: Duration,
}

impl<const N: usize> WindowState<N> {
    fn new(time_now: Duration) -> Self {
        Self {
            ring: BucketRing::new(),
            window_start: time_now,
            last_roll: time_now,
        }
    }

    /// Move the ring forward so that `now` falls into logical bucket 0
    ///
    /// A clock reading older than the window start rolls nothing.
    fn roll_forward(&mut self, now: Duration, bucket_interval: Duration) {
        let elapsed = now.saturating_sub(self.window_start);
        let (steps, rest) = split_buckets(elapsed, bucket_interval);

        if steps > 0 {
            if steps >= N as u64 {
                debug!(steps, buckets = N, "sliding window fully expired");
            }
            self.ring.advance(steps);
            self.window_start += elapsed - rest;
        }
        self.last_roll = self.last_roll.max(now);
        debug_assert!(
            self.window_start <= self.last_roll,
            "window start ahead of the latest clock reading"
        );
    }

    fn admit(&mut self, now: Duration, tokens: u64, config: &SlidingWindowConfig) -> LimiterResult {
        self.roll_forward(now, config.bucket_interval);

        let count = self.ring.sum();
        if count.saturating_add(tokens) > config.capacity {
            trace!(count, capacity = config.capacity, tokens, "admission rejected");
            return Err(ExceededLimit);
        }

        let (offset, _) = split_buckets(now.saturating_sub(self.window_start), config.bucket_interval);
        debug_assert_eq!(offset, 0, "clock reading outside the current bucket after roll");
        let offset = offset as usize;
        self.ring
            .access(offset, offset, |slot| *slot = slot.saturating_add(tokens));
        Ok(())
    }
}

/// Number of whole buckets in `elapsed` and the time left over
fn split_buckets(elapsed: Duration, bucket_interval: Duration) -> (u64, Duration) {
    const NANOS_PER_SEC: u128 = 1_000_000_000;

    let interval_ns = bucket_interval.as_nanos();
    let elapsed_ns = elapsed.as_nanos();
    let steps = u64::try_from(elapsed_ns / interval_ns).unwrap_or(u64::MAX);
    let rest = elapsed_ns % interval_ns;
    let rest = Duration::new((rest / NANOS_PER_SEC) as u64, (rest % NANOS_PER_SEC) as u32);
    (steps, rest)
}
