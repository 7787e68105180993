// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Catches values the adapter would reject at construction time, plus
//! combinations that load fine but behave badly.

use crate::{ConfigError, ConfigResult, NbSerialConfig};
use std::time::Duration;

pub const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    MustBePositive { field: String },
    BackoffOrder { start: Duration, max: Duration },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MustBePositive { field } => {
                write!(f, "{} must be greater than zero", field)
            }
            Self::BackoffOrder { start, max } => {
                write!(
                    f,
                    "Backoff start {:?} is larger than backoff max {:?}",
                    start, max
                )
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &NbSerialConfig) -> ConfigResult<()> {
    let errors = collect_errors(config);
    if errors.is_empty() {
        return Ok(());
    }

    let error_messages = errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n");
    Err(ConfigError::ValidationError(format!(
        "Configuration validation failed:\n{}",
        error_messages
    )))
}

/// Every validation failure in `config`, in field order
pub fn collect_errors(config: &NbSerialConfig) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();
    validate_reader(config, &mut errors);
    validate_logging(config, &mut errors);
    errors
}

fn validate_reader(config: &NbSerialConfig, errors: &mut Vec<ConfigValidationError>) {
    let reader = &config.reader;

    if reader.poll_interval_ms == 0 {
        errors.push(ConfigValidationError::MustBePositive {
            field: "reader.poll_interval_ms".to_string(),
        });
    }

    if reader.backoff_max_ms == 0 {
        errors.push(ConfigValidationError::MustBePositive {
            field: "reader.backoff_max_ms".to_string(),
        });
    } else {
        let start = Duration::from_nanos(reader.backoff_start_ns);
        let max = Duration::from_millis(reader.backoff_max_ms);
        if start > max {
            errors.push(ConfigValidationError::BackoffOrder { start, max });
        }
    }

    // A threshold below one chunk still works but throttles after every read
    if reader.max_read_buffered != 0 && reader.max_read_buffered < reader.max_read_size {
        errors.push(ConfigValidationError::InvalidValue {
            field: "reader.max_read_buffered".to_string(),
            reason: format!(
                "{} is smaller than reader.max_read_size ({})",
                reader.max_read_buffered, reader.max_read_size
            ),
        });
    }

    if let Some(label) = &reader.label {
        if label.trim().is_empty() {
            errors.push(ConfigValidationError::InvalidValue {
                field: "reader.label".to_string(),
                reason: "must not be blank".to_string(),
            });
        }
    }
}

fn validate_logging(config: &NbSerialConfig, errors: &mut Vec<ConfigValidationError>) {
    let level = config.logging.level.to_ascii_lowercase();
    if !VALID_LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.level".to_string(),
            reason: format!(
                "'{}' is not one of {}",
                config.logging.level,
                VALID_LOG_LEVELS.join(", ")
            ),
        });
    }
}
