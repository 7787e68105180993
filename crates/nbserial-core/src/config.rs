// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration for [`NonBlocking`](crate::NonBlocking)

use crate::backoff::ExponentialBackoff;
use crate::error::{Result, StreamError};
use std::time::Duration;

/// Bytes requested per underlying read when `max_read_size` is zero
pub const DEFAULT_MAX_READ_SIZE: usize = 1024;

/// Backpressure threshold used by [`NonBlockingConfig::default`]
pub const DEFAULT_MAX_READ_BUFFERED: usize = 32 * 1024;

/// Longest a waiting reader sleeps between buffer checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub const DEFAULT_BACKOFF_START: Duration = Duration::from_nanos(1);
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_millis(150);

/// Adapter configuration builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonBlockingConfig {
    /// Timeout applied by `read`. Zero makes `read` a non-blocking drain that never sleeps.
    /// Loosely corresponds to VTIME in termios.
    pub read_timeout: Duration,

    /// Bytes requested per underlying read (0 = [`DEFAULT_MAX_READ_SIZE`]).
    /// Loosely corresponds to VMIN in termios.
    pub max_read_size: usize,

    /// Buffered byte count at which the pump stops reading (0 = no limit)
    pub max_read_buffered: usize,

    /// Upper bound on a waiting reader's sleep between buffer checks
    pub poll_interval: Duration,

    /// Pump backoff after data arrives
    pub backoff_start: Duration,

    /// Pump backoff ceiling while idle or throttled
    pub backoff_max: Duration,

    /// Name used for the pump thread and log fields
    pub label: Option<String>,
}

impl Default for NonBlockingConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::ZERO,
            max_read_size: DEFAULT_MAX_READ_SIZE,
            max_read_buffered: DEFAULT_MAX_READ_BUFFERED,
            poll_interval: DEFAULT_POLL_INTERVAL,
            backoff_start: DEFAULT_BACKOFF_START,
            backoff_max: DEFAULT_BACKOFF_MAX,
            label: None,
        }
    }
}

impl NonBlockingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_max_read_size(mut self, size: usize) -> Self {
        self.max_read_size = size;
        self
    }

    /// Set the backpressure threshold; zero disables it
    pub fn with_max_read_buffered(mut self, threshold: usize) -> Self {
        self.max_read_buffered = threshold;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_backoff(mut self, start: Duration, max: Duration) -> Self {
        self.backoff_start = start;
        self.backoff_max = max;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Bytes the pump requests per read, with the zero default applied
    pub fn chunk_size(&self) -> usize {
        if self.max_read_size == 0 {
            DEFAULT_MAX_READ_SIZE
        } else {
            self.max_read_size
        }
    }

    /// Check the configuration and build the pump's backoff from it
    pub fn validate(&self) -> Result<ExponentialBackoff> {
        if self.poll_interval.is_zero() {
            return Err(StreamError::Config(
                "poll_interval must be non-zero".to_string(),
            ));
        }
        ExponentialBackoff::new(self.backoff_start, self.backoff_max)
    }
}
