// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Stream doubles shared by the integration tests

#![allow(dead_code)]

use nbserial_core::{BlockingStream, ReadStatus};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// In-memory stream: serves `data` in reads of any size, then end of stream
pub struct MemStream {
    data: Mutex<VecDeque<u8>>,
    /// Report the end together with the final bytes instead of on a separate empty read
    end_with_last: bool,
    pub written: Mutex<Vec<u8>>,
    pub closed: AtomicBool,
}

impl MemStream {
    pub fn new(data: &[u8]) -> Self {
        Self {
            data: Mutex::new(data.iter().copied().collect()),
            end_with_last: false,
            written: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn ending_with_last_chunk(data: &[u8]) -> Self {
        Self {
            end_with_last: true,
            ..Self::new(data)
        }
    }
}

impl BlockingStream for MemStream {
    fn read(&self, buf: &mut [u8]) -> io::Result<ReadStatus> {
        let mut data = self.data.lock();
        let n = buf.len().min(data.len());
        for (slot, byte) in buf.iter_mut().zip(data.drain(..n)) {
            *slot = byte;
        }
        if data.is_empty() && (n == 0 || self.end_with_last) {
            Ok(ReadStatus::End(n))
        } else {
            Ok(ReadStatus::Data(n))
        }
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        self.written.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn close(&self) -> io::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Sleeps `delay` before answering each scripted reply; idles once the script runs out
pub struct DelayedStream {
    replies: Mutex<VecDeque<(Duration, Vec<u8>)>>,
    closed: AtomicBool,
}

impl DelayedStream {
    pub fn new(replies: Vec<(Duration, Vec<u8>)>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            closed: AtomicBool::new(false),
        }
    }
}

impl BlockingStream for DelayedStream {
    fn read(&self, buf: &mut [u8]) -> io::Result<ReadStatus> {
        if self.closed.load(Ordering::SeqCst) {
            return Ok(ReadStatus::End(0));
        }
        let next = self.replies.lock().pop_front();
        match next {
            Some((delay, reply)) => {
                thread::sleep(delay);
                let n = reply.len().min(buf.len());
                buf[..n].copy_from_slice(&reply[..n]);
                Ok(ReadStatus::Data(n))
            }
            None => {
                thread::sleep(Duration::from_millis(5));
                Ok(ReadStatus::Data(0))
            }
        }
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn close(&self) -> io::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Never runs dry: every read fills the buffer with a wrapping byte counter
pub struct CounterStream {
    next: Mutex<u8>,
    pub reads: Arc<AtomicUsize>,
}

impl CounterStream {
    pub fn new() -> Self {
        Self {
            next: Mutex::new(0),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl BlockingStream for CounterStream {
    fn read(&self, buf: &mut [u8]) -> io::Result<ReadStatus> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let mut next = self.next.lock();
        for slot in buf.iter_mut() {
            *slot = *next;
            *next = next.wrapping_add(1);
        }
        Ok(ReadStatus::Data(buf.len()))
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn close(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Idles until closed; flips `dropped` when the last handle goes away
pub struct IdleStream {
    closed: AtomicBool,
    pub dropped: Arc<AtomicBool>,
}

impl IdleStream {
    pub fn new() -> Self {
        Self {
            closed: AtomicBool::new(false),
            dropped: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl BlockingStream for IdleStream {
    fn read(&self, _buf: &mut [u8]) -> io::Result<ReadStatus> {
        if self.closed.load(Ordering::SeqCst) {
            return Ok(ReadStatus::End(0));
        }
        thread::sleep(Duration::from_millis(2));
        Ok(ReadStatus::Data(0))
    }

    fn write(&self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "write side gone"))
    }

    fn close(&self) -> io::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for IdleStream {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

/// Panics on the first read
pub struct PanickingStream;

impl BlockingStream for PanickingStream {
    fn read(&self, _buf: &mut [u8]) -> io::Result<ReadStatus> {
        panic!("driver fault");
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn close(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Keep reading until the stream reports its terminal error
pub fn drain_all<S: BlockingStream>(
    nb: &nbserial_core::NonBlocking<S>,
    chunk: usize,
) -> (Vec<u8>, nbserial_core::StreamError) {
    let mut out = Vec::new();
    let mut buf = vec![0u8; chunk];
    let deadline = std::time::Instant::now() + Duration::from_secs(10);
    loop {
        assert!(std::time::Instant::now() < deadline, "stream never ended");
        match nb.read(&mut buf) {
            Ok(0) => thread::sleep(Duration::from_millis(1)),
            Ok(n) => out.extend_from_slice(&buf[..n]),
            Err(e) if e.is_retryable() => {}
            Err(e) => return (out, e),
        }
    }
}
