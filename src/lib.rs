// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # nbserial
//!
//! Non-blocking, deadline-bounded reads for serial ports and any other byte
//! stream whose reads block until data shows up.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! nbserial = "0.1"  # Default: core + config + observability
//! ```
//!
//! ## Feature Flags
//! - **`config`** (default): `nbserial.toml` loading with env/CLI overrides
//! - **`observability`** (default): logging setup and `--debug-<crate>` flags
//! - **`file-logging`**: daily-rotated log files
//! - **`cli`**: builds the `nbcat` tool
//!
//! ## Usage
//!
//! ```rust,no_run
//! use nbserial::prelude::*;
//! use std::net::TcpStream;
//! use std::time::Duration;
//!
//! let link = TcpStream::connect("127.0.0.1:4000")?;
//! let port = NonBlocking::new(link, NonBlockingConfig::new())?;
//!
//! port.write(b"PING\n")?;
//! let mut reply = [0u8; 32];
//! match port.read_timeout(&mut reply, Duration::from_millis(250)) {
//!     Ok(n) => println!("{:?}", &reply[..n]),
//!     Err(e) if e.is_retryable() => println!("device is quiet"),
//!     Err(e) => return Err(e.into()),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use nbserial_core as adapter;

#[cfg(feature = "config")]
pub use nbserial_config as config;

#[cfg(feature = "observability")]
pub use nbserial_observability as observability;

pub use nbserial_core::{
    BlockingStream, Mode, NonBlocking, NonBlockingConfig, Parity, ReadStatus, StopBits,
    StreamError, Terminal,
};

/// Wrap `stream` using the `[reader]` section of a loaded configuration
#[cfg(feature = "config")]
pub fn from_config<S: BlockingStream>(
    stream: S,
    config: &nbserial_config::NbSerialConfig,
) -> nbserial_core::Result<NonBlocking<S>> {
    tracing::debug!(label = ?config.reader.label, "wrapping stream from config");
    NonBlocking::new(stream, config.reader.to_nonblocking_config())
}

/// Prelude with commonly used types
pub mod prelude {
    pub use nbserial_core::{
        BlockingStream, ExponentialBackoff, Mode, NonBlocking, NonBlockingConfig, Opener, Parity,
        ReadStatus, ResetInput, StopBits, StreamError, Terminal,
    };

    #[cfg(feature = "config")]
    pub use nbserial_config::{load_config, NbSerialConfig};

    #[cfg(feature = "observability")]
    pub use nbserial_observability::{init_logging, parse_debug_flags, LoggingOptions};
}
