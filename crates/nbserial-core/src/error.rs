// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for the non-blocking adapter

use std::io;
use thiserror::Error;

/// Errors surfaced by [`NonBlocking`](crate::NonBlocking) and its configuration.
#[derive(Error, Debug)]
pub enum StreamError {
    /// No bytes arrived before the caller's deadline. Retry with a new deadline.
    #[error("blocking deadline exceeded")]
    DeadlineExceeded,

    /// The underlying stream ended or the adapter was closed.
    #[error("stream ended")]
    StreamEnded,

    /// The background pump panicked. Treated like [`StreamError::StreamEnded`].
    #[error("pump failed: {0}")]
    PumpFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl StreamError {
    /// True for errors after which the adapter will never produce data again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::StreamEnded | Self::PumpFailed(_))
    }

    /// True for errors a caller can recover from by reading again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DeadlineExceeded)
    }
}

impl From<StreamError> for io::Error {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Io(e) => e,
            StreamError::DeadlineExceeded => io::Error::new(io::ErrorKind::TimedOut, err),
            StreamError::StreamEnded => io::Error::new(io::ErrorKind::UnexpectedEof, err),
            StreamError::Config(_) => io::Error::new(io::ErrorKind::InvalidInput, err),
            StreamError::PumpFailed(_) => io::Error::new(io::ErrorKind::Other, err),
        }
    }
}

/// Value held in the terminal slot once the pump is done.
///
/// Kept separate from [`StreamError`] because it must be cloneable: every
/// reader that drains the buffer observes the same terminal value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal {
    /// End of stream, or [`NonBlocking::close`](crate::NonBlocking::close).
    Ended,
    /// The pump panicked with the given message.
    PumpFailed(String),
}

impl From<Terminal> for StreamError {
    fn from(terminal: Terminal) -> Self {
        match terminal {
            Terminal::Ended => StreamError::StreamEnded,
            Terminal::PumpFailed(msg) => StreamError::PumpFailed(msg),
        }
    }
}

/// Result type for adapter operations
pub type Result<T> = std::result::Result<T, StreamError>;
