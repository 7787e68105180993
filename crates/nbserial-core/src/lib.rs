// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # nbserial-core
//!
//! Deadline-bounded reads over blocking byte streams such as serial lines.
//!
//! A [`NonBlocking`] owns a [`BlockingStream`] and a background pump thread
//! that keeps reading it into a buffer. Callers read from that buffer with a
//! deadline, so a device that never answers costs at most one timeout.
//!
//! ```no_run
//! use nbserial_core::{NonBlocking, NonBlockingConfig, StreamError};
//! use std::net::TcpStream;
//! use std::time::Duration;
//!
//! let stream = TcpStream::connect("127.0.0.1:4000")?;
//! let port = NonBlocking::new(
//!     stream,
//!     NonBlockingConfig::new().with_read_timeout(Duration::from_millis(200)),
//! )?;
//!
//! port.write(b"ID?\n")?;
//! let mut reply = [0u8; 64];
//! match port.read(&mut reply) {
//!     Ok(n) => println!("device answered {:?}", &reply[..n]),
//!     Err(StreamError::DeadlineExceeded) => println!("no answer"),
//!     Err(e) => return Err(e.into()),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Architecture
//!
//! - **`stream`**: the blocking stream trait the adapter wraps
//! - **`pump`**: background reader with backpressure and backoff
//! - **`shared`**: byte queue and terminal slot shared by pump and readers
//! - **`nonblocking`**: the caller-facing adapter and its deadline read loop
//! - **`mode`**: serial line settings and port-library seams

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod backoff;
pub mod config;
pub mod error;
pub mod mode;
pub mod nonblocking;
mod pump;
pub mod shared;
pub mod stream;

pub use backoff::ExponentialBackoff;
pub use config::NonBlockingConfig;
pub use error::{Result, StreamError, Terminal};
pub use mode::{Mode, Opener, Parity, ResetInput, StopBits};
pub use nonblocking::NonBlocking;
pub use shared::SharedBuffer;
pub use stream::{BlockingStream, ReadStatus};
