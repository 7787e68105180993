// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! Each struct maps to a section of `nbserial.toml`.

use nbserial_core::config::{
    DEFAULT_BACKOFF_MAX, DEFAULT_BACKOFF_START, DEFAULT_MAX_READ_BUFFERED,
    DEFAULT_MAX_READ_SIZE, DEFAULT_POLL_INTERVAL,
};
use nbserial_core::NonBlockingConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NbSerialConfig {
    pub reader: ReaderConfig,
    pub logging: LoggingConfig,
}

/// `[reader]`: non-blocking adapter settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// 0 = reads drain the buffer and return at once
    pub read_timeout_ms: u64,
    /// Bytes per underlying read (0 = crate default)
    pub max_read_size: usize,
    /// Backpressure threshold in bytes (0 = no limit)
    pub max_read_buffered: usize,
    pub poll_interval_ms: u64,
    pub backoff_start_ns: u64,
    pub backoff_max_ms: u64,
    pub label: Option<String>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: 0,
            max_read_size: DEFAULT_MAX_READ_SIZE,
            max_read_buffered: DEFAULT_MAX_READ_BUFFERED,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            backoff_start_ns: DEFAULT_BACKOFF_START.as_nanos() as u64,
            backoff_max_ms: DEFAULT_BACKOFF_MAX.as_millis() as u64,
            label: None,
        }
    }
}

impl ReaderConfig {
    pub fn to_nonblocking_config(&self) -> NonBlockingConfig {
        let mut config = NonBlockingConfig::new()
            .with_read_timeout(Duration::from_millis(self.read_timeout_ms))
            .with_max_read_size(self.max_read_size)
            .with_max_read_buffered(self.max_read_buffered)
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
            .with_backoff(
                Duration::from_nanos(self.backoff_start_ns),
                Duration::from_millis(self.backoff_max_ms),
            );
        if let Some(label) = &self.label {
            config = config.with_label(label.clone());
        }
        config
    }
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
