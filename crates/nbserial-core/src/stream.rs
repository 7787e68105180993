// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! The blocking byte stream the adapter wraps
//!
//! Methods take `&self`: the pump sits in `read` while callers `write` and
//! `close` from other threads, the way a serial line or socket is used.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;

/// Outcome of one blocking read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// `n` bytes were read. Zero means nothing arrived (idle), not end of stream.
    Data(usize),
    /// `n` final bytes were read and the stream has ended.
    End(usize),
}

impl ReadStatus {
    /// Bytes carried by this read
    pub fn len(&self) -> usize {
        match *self {
            ReadStatus::Data(n) | ReadStatus::End(n) => n,
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, ReadStatus::End(_))
    }

    /// Translate a `std::io::Read` result.
    ///
    /// `Ok(0)` and `UnexpectedEof` mean end of stream; `TimedOut`,
    /// `WouldBlock` and `Interrupted` mean nothing arrived yet.
    pub fn from_io(result: io::Result<usize>) -> io::Result<ReadStatus> {
        match result {
            Ok(0) => Ok(ReadStatus::End(0)),
            Ok(n) => Ok(ReadStatus::Data(n)),
            Err(e) => match e.kind() {
                io::ErrorKind::UnexpectedEof => Ok(ReadStatus::End(0)),
                io::ErrorKind::TimedOut
                | io::ErrorKind::WouldBlock
                | io::ErrorKind::Interrupted => Ok(ReadStatus::Data(0)),
                _ => Err(e),
            },
        }
    }
}

/// A blocking, full-duplex byte stream
pub trait BlockingStream: Send + Sync + 'static {
    /// Block until some bytes arrive, the stream ends, or the transport's own timeout fires
    fn read(&self, buf: &mut [u8]) -> io::Result<ReadStatus>;

    fn write(&self, buf: &[u8]) -> io::Result<usize>;

    /// Release the handle. May or may not wake a `read` blocked on another thread.
    fn close(&self) -> io::Result<()>;
}

impl BlockingStream for TcpStream {
    fn read(&self, buf: &mut [u8]) -> io::Result<ReadStatus> {
        let mut stream: &TcpStream = self;
        ReadStatus::from_io(Read::read(&mut stream, buf))
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut stream: &TcpStream = self;
        Write::write(&mut stream, buf)
    }

    /// Shuts down both directions, which wakes a blocked reader on most platforms
    fn close(&self) -> io::Result<()> {
        match self.shutdown(Shutdown::Both) {
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}

impl<T: BlockingStream + ?Sized> BlockingStream for Arc<T> {
    fn read(&self, buf: &mut [u8]) -> io::Result<ReadStatus> {
        (**self).read(buf)
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn close(&self) -> io::Result<()> {
        (**self).close()
    }
}

impl<T: BlockingStream + ?Sized> BlockingStream for Box<T> {
    fn read(&self, buf: &mut [u8]) -> io::Result<ReadStatus> {
        (**self).read(buf)
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn close(&self) -> io::Result<()> {
        (**self).close()
    }
}
