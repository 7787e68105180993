// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Non-blocking wrapper around a blocking byte stream
//!
//! A textbook use: several USB/serial devices are attached and each must be
//! written to and read from to find out which is which. A silent device would
//! block a plain `read` forever. Wrapped in [`NonBlocking`] with a timeout,
//! every read returns by its deadline.

use crate::config::NonBlockingConfig;
use crate::error::{Result, StreamError, Terminal};
use crate::mode::ResetInput;
use crate::pump::{self, PumpSettings};
use crate::shared::SharedBuffer;
use crate::stream::BlockingStream;
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Deadline-bounded reader over a [`BlockingStream`]
///
/// Construction spawns a pump thread that keeps reading the stream into an
/// internal buffer; reads are served from that buffer. Writes go straight to
/// the stream.
///
/// # Thread Safety
///
/// All methods take `&self`. Concurrent readers each receive distinct bytes;
/// which reader gets which bytes is unspecified.
pub struct NonBlocking<S: BlockingStream> {
    stream: Arc<S>,
    shared: Arc<SharedBuffer>,
    read_timeout: Duration,
    poll_interval: Duration,
    label: String,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl<S: BlockingStream> NonBlocking<S> {
    /// Wrap `stream` and start the pump
    ///
    /// # Errors
    /// - [`StreamError::Config`] if the configuration is invalid
    /// - [`StreamError::Io`] if the pump thread cannot be spawned
    pub fn new(stream: S, config: NonBlockingConfig) -> Result<Self> {
        let backoff = config.validate()?;
        let label = config.label.clone().unwrap_or_else(|| "stream".to_string());
        let stream = Arc::new(stream);
        let shared = Arc::new(SharedBuffer::new());

        let settings = PumpSettings {
            chunk_size: config.chunk_size(),
            max_buffered: config.max_read_buffered,
            backoff,
            label: label.clone(),
        };
        let handle = pump::spawn(Arc::clone(&stream), Arc::clone(&shared), settings)?;

        debug!(
            label = %label,
            read_timeout = ?config.read_timeout,
            chunk_size = config.chunk_size(),
            max_buffered = config.max_read_buffered,
            "NonBlocking created"
        );

        Ok(Self {
            stream,
            shared,
            read_timeout: config.read_timeout,
            poll_interval: config.poll_interval,
            label,
            pump: Mutex::new(Some(handle)),
        })
    }

    /// Read using the configured timeout.
    ///
    /// With a zero timeout this drains whatever is buffered and returns at
    /// once, never sleeping. Otherwise it behaves as
    /// [`read_deadline`](Self::read_deadline) with `now + timeout`.
    pub fn read(&self, dst: &mut [u8]) -> Result<usize> {
        if self.read_timeout.is_zero() {
            let (n, terminal) = self.shared.take_with_terminal(dst);
            return match terminal {
                Some(t) if n == 0 => Err(t.into()),
                _ => Ok(n),
            };
        }
        self.read_until(dst, deadline_after(self.read_timeout))
    }

    /// Read with a timeout relative to now.
    ///
    /// A timeout too large to represent as an `Instant` waits without a deadline.
    pub fn read_timeout(&self, dst: &mut [u8], timeout: Duration) -> Result<usize> {
        self.read_until(dst, deadline_after(timeout))
    }

    /// Fill `dst` from the buffer until it is full or `deadline` passes.
    ///
    /// If any bytes were delivered the call succeeds; an error met on the way
    /// is left for the next call so the last bytes of a stream are never lost
    /// alongside it.
    pub fn read_deadline(&self, dst: &mut [u8], deadline: Instant) -> Result<usize> {
        self.read_until(dst, Some(deadline))
    }

    /// `None` means no deadline: wait until `dst` fills or the stream finishes
    fn read_until(&self, dst: &mut [u8], deadline: Option<Instant>) -> Result<usize> {
        let mut n = 0;
        let mut stopped_by = None;
        while n < dst.len() {
            match self.read_next(&mut dst[n..], deadline) {
                Ok(nn) => n += nn,
                Err(e) => {
                    stopped_by = Some(e);
                    break;
                }
            }
        }
        if n != 0 {
            return Ok(n);
        }
        if let Some(e) = stopped_by {
            return Err(e);
        }
        // Nothing left to read from a finished stream
        match self.shared.terminal() {
            Some(t) => Err(t.into()),
            None => Ok(0),
        }
    }

    /// One fetch: wait for the buffer to hold data, then take what fits
    fn read_next(&self, dst: &mut [u8], deadline: Option<Instant>) -> Result<usize> {
        while self.shared.is_empty() {
            let nap = match deadline {
                Some(deadline) => match deadline.checked_duration_since(Instant::now()) {
                    Some(remaining) => self.poll_interval.min(remaining),
                    None => return Err(StreamError::DeadlineExceeded),
                },
                None => self.poll_interval,
            };
            if let Some(t) = self.shared.terminal() {
                // Pump is done, nothing will arrive
                return Err(t.into());
            }
            thread::sleep(nap);
        }
        // Zero here means another reader won the race; the caller retries
        Ok(self.shared.take(dst))
    }

    /// Pass `buf` straight to the underlying stream
    pub fn write(&self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    /// Mark the adapter finished and close the underlying stream.
    ///
    /// Returns without waiting for the pump: if the stream's `close` does not
    /// wake a blocked read, the pump exits once that read returns on its own.
    /// Calling `close` again only repeats the underlying close.
    pub fn close(&self) -> Result<()> {
        if self.shared.set_terminal(Terminal::Ended) {
            debug!(label = %self.label, "NonBlocking closed");
        }
        self.stream.close()?;
        Ok(())
    }

    /// Discard everything buffered but not yet read.
    ///
    /// Useful for request/response protocols, where a reply that arrived
    /// after one request timed out would otherwise be read as the reply to
    /// the next request.
    pub fn reset(&self) {
        let discarded = self.shared.reset();
        if discarded > 0 {
            trace!(label = %self.label, bytes = discarded, "discarded buffered input");
        }
    }

    /// Bytes buffered and ready to read
    pub fn buffered(&self) -> usize {
        self.shared.len()
    }

    /// Terminal state, if the stream has finished
    pub fn terminal(&self) -> Option<Terminal> {
        self.shared.terminal()
    }

    /// True while the pump thread is alive
    pub fn is_pump_running(&self) -> bool {
        self.pump
            .lock()
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    /// Wait up to `timeout` for the pump thread to exit. Returns true if it has.
    pub fn join_pump(&self, timeout: Duration) -> bool {
        let deadline = deadline_after(timeout);
        loop {
            let mut guard = self.pump.lock();
            match guard.as_ref() {
                None => return true,
                Some(handle) if handle.is_finished() => {
                    if let Some(handle) = guard.take() {
                        // Panics are already caught inside the pump
                        let _ = handle.join();
                    }
                    return true;
                }
                Some(_) => {}
            }
            drop(guard);
            let nap = match deadline {
                Some(deadline) => match deadline.checked_duration_since(Instant::now()) {
                    Some(remaining) => self.poll_interval.min(remaining),
                    None => return false,
                },
                None => self.poll_interval,
            };
            thread::sleep(nap);
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// The wrapped stream
    pub fn get_ref(&self) -> &S {
        &self.stream
    }
}

/// `now + timeout`, or `None` when that overflows `Instant`
fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

impl<S: BlockingStream> Drop for NonBlocking<S> {
    /// Stops the pump after its in-flight read. The stream is released, not closed.
    fn drop(&mut self) {
        self.shared.set_terminal(Terminal::Ended);
    }
}

impl<S: BlockingStream> std::fmt::Debug for NonBlocking<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonBlocking")
            .field("label", &self.label)
            .field("read_timeout", &self.read_timeout)
            .field("buffered", &self.buffered())
            .field("terminal", &self.terminal())
            .finish()
    }
}

impl<S: BlockingStream> ResetInput for NonBlocking<S> {
    fn reset_input_buffer(&self) -> io::Result<()> {
        self.reset();
        Ok(())
    }
}

fn read_into_io<S: BlockingStream>(nb: &NonBlocking<S>, buf: &mut [u8]) -> io::Result<usize> {
    if buf.is_empty() {
        return Ok(0);
    }
    match nb.read(buf) {
        Ok(0) => Err(io::Error::new(
            io::ErrorKind::WouldBlock,
            "no buffered data available",
        )),
        Ok(n) => Ok(n),
        Err(StreamError::StreamEnded) => Ok(0),
        Err(e) => Err(e.into()),
    }
}

/// `Ok(0)` means end of stream; an empty non-blocking drain is `WouldBlock`.
impl<S: BlockingStream> io::Read for NonBlocking<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        read_into_io(self, buf)
    }
}

impl<S: BlockingStream> io::Read for &NonBlocking<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        read_into_io(self, buf)
    }
}

impl<S: BlockingStream> io::Write for NonBlocking<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: BlockingStream> io::Write for &NonBlocking<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
