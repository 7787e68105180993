// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # nbserial-observability
//!
//! Logging setup shared by the nbserial crates and tools, with per-crate
//! debug flag support.
//!
//! ## Features
//! - `file-logging`: daily-rotated log file next to the console output

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;

pub use cli::*;
pub use init::*;

/// Crate names accepted by `--debug-<crate>` and `NBSERIAL_DEBUG`
pub const KNOWN_CRATES: &[&str] = &[
    "nbserial-core",
    "nbserial-config",
    "nbserial-observability",
    "nbcat",
];
