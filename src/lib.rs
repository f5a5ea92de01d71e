//! # Ringlimit
//!
//! Ringlimit is a small crate providing a sliding window admission
//! counter backed by a fixed, stack allocated ring of bucket counters.
//!
//! Instead of storing one timestamp per request, the window is split
//! into `N` equally sized buckets. Each admitted request bumps the
//! counter of the bucket it falls into, and rolling the window forward
//! clears the buckets that have aged out. Memory use is fixed at
//! construction and the cost of decaying is bounded by `N`, regardless
//! of the request rate.
//!
//! ## Building blocks
//!
//! * [`BucketRing`] - fixed-length circular array of counters
//! * [`SlidingWindow`] - thread safe limiter built on a [`BucketRing`]
//!
//! ## Platform support
//!
//! On `std` targets you can use the following utility functions for
//! instantiating limiters driven by a monotonic system clock:
//!
//! * [`sliding_window`] - 10 buckets of 100 ms each
//! * [`sliding_window_with_interval`] - custom bucket count and width
//!
//! Limiters with a custom clock, e.g. for tests, are created with
//! [`SlidingWindow::new_with_time_provider`]. The clock is a closure
//! returning the current time as a [`Duration`](core::time::Duration)
//! from some fixed point in the past.
//!
//! The limiter needs a mutex and is therefore only available with the
//! `std` feature. [`BucketRing`] and the error types work on `no_std`.
//!
//! ## Example
//!
//! ```rust
//! use ringlimit::Limiter;
//!
//! // At most 3 requests per 1 second window
//! let limiter = ringlimit::sliding_window(3);
//!
//! assert!(limiter.allow().is_ok());
//! assert!(limiter.allow().is_ok());
//! assert!(limiter.allow().is_ok());
//! assert!(limiter.allow().is_err());
//! ```

// Support no_std
#![cfg_attr(not(feature = "std"), no_std)]

mod ring;
#[cfg(feature = "std")]
mod sliding_window_impl;

#[cfg(feature = "std")]
#[cfg(test)]
mod mock_assets;
#[cfg(feature = "std")]
#[cfg(test)]
mod test;

use core::fmt;

pub use ring::BucketRing;

#[cfg(feature = "std")]
pub use sliding_window_impl::{
    sliding_window, sliding_window_with_interval, SlidingWindow, SlidingWindowConfig,
    DEFAULT_BUCKET_COUNT, DEFAULT_BUCKET_INTERVAL,
};

/// Error type indicating that admitting the request would
/// push the window total past its capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceededLimit;

impl fmt::Display for ExceededLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Request exceeds the sliding window limit")
    }
}

// core::error::Error trait stabilised at release 1.81
#[rustversion::since(1.81)]
impl core::error::Error for ExceededLimit {}

#[rustversion::before(1.81)]
#[cfg(feature = "std")]
impl std::error::Error for ExceededLimit {}

/// Admission result type
///
/// Rejection is the only possible failure, so the error type
/// carries no further information.
pub type LimiterResult = Result<(), ExceededLimit>;

/// Common interface for admission limiters
///
/// Methods take `&self` so a single limiter can be shared between
/// threads, e.g. behind an `Arc`.
pub trait Limiter {
    /// Try to admit a request weighing `tokens`
    ///
    /// Consuming zero tokens always succeeds.
    fn try_consume(&self, tokens: u64) -> LimiterResult;

    /// Try to consume a single token
    fn try_consume_one(&self) -> LimiterResult {
        self.try_consume(1)
    }

    /// Try to admit a single request
    fn allow(&self) -> LimiterResult {
        self.try_consume_one()
    }
}

#[cfg(feature = "std")]
mod macros {
    macro_rules! std_time_provider {
        () => {{
            let origin = std::time::Instant::now();
            move || origin.elapsed()
        }};
    }

    pub(crate) use std_time_provider;
}
