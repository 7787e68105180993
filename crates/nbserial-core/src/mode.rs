// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Serial line settings and the seams for port libraries
//!
//! Opening a port and translating a [`Mode`] into a library's native options
//! is left to [`Opener`] implementations outside this crate.

use crate::error::{Result, StreamError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::time::Duration;

/// Parity bit setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
    Mark,
    Space,
}

impl Parity {
    /// Single-letter form used by most port libraries (`N`, `O`, `E`, `M`, `S`)
    pub fn as_char(self) -> char {
        match self {
            Parity::None => 'N',
            Parity::Odd => 'O',
            Parity::Even => 'E',
            Parity::Mark => 'M',
            Parity::Space => 'S',
        }
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Parity::None => "none",
            Parity::Odd => "odd",
            Parity::Even => "even",
            Parity::Mark => "mark",
            Parity::Space => "space",
        };
        f.write_str(name)
    }
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StopBits {
    #[default]
    #[serde(rename = "1")]
    One,
    #[serde(rename = "1.5")]
    OneHalf,
    #[serde(rename = "2")]
    Two,
}

impl StopBits {
    /// Stop bits counted in half bits (2, 3 or 4)
    pub fn halves(self) -> u8 {
        match self {
            StopBits::One => 2,
            StopBits::OneHalf => 3,
            StopBits::Two => 4,
        }
    }
}

impl fmt::Display for StopBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopBits::One => "1",
            StopBits::OneHalf => "1.5",
            StopBits::Two => "2",
        };
        f.write_str(s)
    }
}

/// Serial port configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Mode {
    pub baud_rate: u32,
    /// 5, 6, 7 or 8. Zero means 8.
    pub data_bits: u8,
    /// Transport-level read timeout. Not every port library supports one.
    pub read_timeout: Duration,
    pub parity: Parity,
    pub stop_bits: StopBits,
}

impl Mode {
    /// 8 data bits, no parity, one stop bit
    pub fn new(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            data_bits: 8,
            ..Self::default()
        }
    }

    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    pub fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    pub fn with_data_bits(mut self, data_bits: u8) -> Self {
        self.data_bits = data_bits;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Data bits with the zero default applied
    pub fn effective_data_bits(&self) -> u8 {
        if self.data_bits == 0 {
            8
        } else {
            self.data_bits
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.baud_rate == 0 {
            return Err(StreamError::Config("baud rate cannot be zero".to_string()));
        }
        if !(5..=8).contains(&self.effective_data_bits()) {
            return Err(StreamError::Config(format!(
                "data bits must be 5-8, got {}",
                self.data_bits
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Mode {
    /// Conventional shorthand, e.g. `9600 8N1`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}{}{}",
            self.baud_rate,
            self.effective_data_bits(),
            self.parity.as_char(),
            self.stop_bits
        )
    }
}

/// Opens ports through a particular serial library, so libraries can be swapped
pub trait Opener {
    type Port;

    /// Open `port_name` (e.g. `/dev/ttyUSB0`, `COM1`) with the given mode
    fn open_port(&self, port_name: &str, mode: &Mode) -> io::Result<Self::Port>;
}

/// Discard data received but not yet read
pub trait ResetInput {
    fn reset_input_buffer(&self) -> io::Result<()>;
}
