// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Exponential backoff used by the pump when the stream is idle or the buffer is full

use crate::error::{Result, StreamError};
use std::time::Duration;

/// Exponential backoff delay with a ceiling.
///
/// [`miss`](Self::miss) sleeps for the current wait and then grows it;
/// [`hit`](Self::hit) drops it back to the start value as soon as data flows.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// Amount of time the next `miss` sleeps for
    wait: Duration,

    /// Value `wait` takes after a `hit`
    start_wait: Duration,

    /// Ceiling for `wait`
    max_wait: Duration,

    /// Left shift applied on each miss (1 = doubling)
    shift: u32,
}

impl ExponentialBackoff {
    /// Create a new backoff
    ///
    /// # Arguments
    /// * `start_wait` - Wait after a hit (may be zero)
    /// * `max_wait` - Ceiling for the wait; must be non-zero
    pub fn new(start_wait: Duration, max_wait: Duration) -> Result<Self> {
        if max_wait.is_zero() {
            return Err(StreamError::Config(
                "backoff ceiling cannot be zero".to_string(),
            ));
        }
        if start_wait > max_wait {
            return Err(StreamError::Config(format!(
                "backoff start {:?} exceeds ceiling {:?}",
                start_wait, max_wait
            )));
        }
        Ok(Self {
            wait: start_wait,
            start_wait,
            max_wait,
            shift: 1,
        })
    }

    /// Grow by `2^shift` per miss instead of doubling. A shift of zero is treated as one.
    pub fn with_shift(mut self, shift: u32) -> Self {
        self.shift = shift.clamp(1, 63);
        self
    }

    /// Data arrived: reset the wait to its start value
    pub fn hit(&mut self) {
        self.wait = self.start_wait;
    }

    /// Nothing to do: sleep for the current wait, then grow it
    pub fn miss(&mut self) {
        let wait = self.advance();
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
    }

    /// Return the current wait and grow it, without sleeping
    pub fn advance(&mut self) -> Duration {
        let current = self.wait;
        let nanos = u64::try_from(current.as_nanos()).unwrap_or(u64::MAX);
        let grown = (nanos | 1).saturating_mul(1u64 << self.shift);
        self.wait = Duration::from_nanos(grown).min(self.max_wait);
        current
    }

    /// Wait the next `miss` will sleep for
    pub fn current_wait(&self) -> Duration {
        self.wait
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_ceiling_rejected() {
        let result = ExponentialBackoff::new(Duration::ZERO, Duration::ZERO);
        assert!(matches!(result, Err(StreamError::Config(_))));
    }

    #[test]
    fn test_start_above_ceiling_rejected() {
        let result = ExponentialBackoff::new(Duration::from_secs(2), Duration::from_secs(1));
        assert!(matches!(result, Err(StreamError::Config(_))));
    }

    #[test]
    fn test_doubling_growth() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_nanos(1), Duration::from_millis(150)).unwrap();

        assert_eq!(backoff.advance(), Duration::from_nanos(1));
        assert_eq!(backoff.advance(), Duration::from_nanos(2)); // (1|1) << 1
        assert_eq!(backoff.advance(), Duration::from_nanos(6)); // (2|1) << 1
        assert_eq!(backoff.advance(), Duration::from_nanos(14)); // (6|1) << 1
    }

    #[test]
    fn test_growth_clamped_to_ceiling() {
        let max = Duration::from_millis(150);
        let mut backoff = ExponentialBackoff::new(Duration::from_nanos(1), max).unwrap();

        for _ in 0..64 {
            backoff.advance();
        }
        assert_eq!(backoff.current_wait(), max);

        // Never decreases once clamped
        backoff.advance();
        assert_eq!(backoff.current_wait(), max);
    }

    #[test]
    fn test_hit_resets() {
        let start = Duration::from_micros(10);
        let mut backoff = ExponentialBackoff::new(start, Duration::from_millis(150)).unwrap();

        backoff.advance();
        backoff.advance();
        assert!(backoff.current_wait() > start);

        backoff.hit();
        assert_eq!(backoff.current_wait(), start);
    }

    #[test]
    fn test_zero_start_still_grows() {
        let mut backoff = ExponentialBackoff::new(Duration::ZERO, Duration::from_millis(1)).unwrap();
        assert_eq!(backoff.advance(), Duration::ZERO);
        assert_eq!(backoff.current_wait(), Duration::from_nanos(2));
    }

    #[test]
    fn test_custom_shift() {
        let mut backoff = ExponentialBackoff::new(Duration::from_nanos(1), Duration::from_secs(1))
            .unwrap()
            .with_shift(2);
        backoff.advance();
        assert_eq!(backoff.current_wait(), Duration::from_nanos(4));

        let backoff = ExponentialBackoff::new(Duration::from_nanos(1), Duration::from_secs(1))
            .unwrap()
            .with_shift(0);
        assert_eq!(backoff.shift, 1);
    }

    #[test]
    fn test_miss_sleeps_roughly_current_wait() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_millis(5), Duration::from_millis(50)).unwrap();
        let started = std::time::Instant::now();
        backoff.miss();
        assert!(started.elapsed() >= Duration::from_millis(5));
        assert_eq!(backoff.current_wait(), Duration::from_nanos(10_000_002));
    }
}
