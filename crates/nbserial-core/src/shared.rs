// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Byte queue and terminal slot shared between the pump and readers
//!
//! Both live under one mutex so readers never see a terminal state that
//! disagrees with the buffer contents. The lock is only held for the
//! duration of a single operation.

use crate::error::Terminal;
use parking_lot::Mutex;
use std::collections::VecDeque;

#[derive(Debug, Default)]
struct Inner {
    buf: VecDeque<u8>,
    terminal: Option<Terminal>,
}

/// FIFO of received bytes plus the once-set terminal slot
#[derive(Debug, Default)]
pub struct SharedBuffer {
    inner: Mutex<Inner>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes at the tail. Only the pump calls this.
    pub fn append(&self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.inner.lock().buf.extend(bytes);
    }

    /// Move up to `dst.len()` bytes from the head into `dst`
    pub fn take(&self, dst: &mut [u8]) -> usize {
        let mut inner = self.inner.lock();
        take_locked(&mut inner.buf, dst)
    }

    /// Drain into `dst` and return the terminal state observed under the same lock
    pub fn take_with_terminal(&self, dst: &mut [u8]) -> (usize, Option<Terminal>) {
        let mut inner = self.inner.lock();
        let n = take_locked(&mut inner.buf, dst);
        (n, inner.terminal.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.lock().buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Set the terminal slot. Returns false if it was already set; the first value wins.
    pub fn set_terminal(&self, terminal: Terminal) -> bool {
        let mut inner = self.inner.lock();
        if inner.terminal.is_some() {
            return false;
        }
        inner.terminal = Some(terminal);
        true
    }

    pub fn terminal(&self) -> Option<Terminal> {
        self.inner.lock().terminal.clone()
    }

    pub fn is_terminated(&self) -> bool {
        self.inner.lock().terminal.is_some()
    }

    /// Discard buffered bytes, leaving the terminal slot alone. Returns the count discarded.
    pub fn reset(&self) -> usize {
        let mut inner = self.inner.lock();
        let discarded = inner.buf.len();
        inner.buf.clear();
        discarded
    }
}

fn take_locked(buf: &mut VecDeque<u8>, dst: &mut [u8]) -> usize {
    let n = dst.len().min(buf.len());
    for (slot, byte) in dst.iter_mut().zip(buf.drain(..n)) {
        *slot = byte;
    }
    n
}
