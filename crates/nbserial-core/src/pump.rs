// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Background pump: moves bytes from the blocking stream into the shared buffer
//!
//! # Design
//! - One named thread per adapter, alive until the terminal slot is set
//! - Backpressure: stops reading while the buffer is at the threshold
//! - Idle reads and throttling back off exponentially instead of spinning
//! - A panic inside the loop becomes [`Terminal::PumpFailed`] instead of unwinding further

use crate::backoff::ExponentialBackoff;
use crate::error::Terminal;
use crate::shared::SharedBuffer;
use crate::stream::{BlockingStream, ReadStatus};
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, trace};

/// Per-pump settings, resolved from the adapter configuration
#[derive(Debug, Clone)]
pub(crate) struct PumpSettings {
    pub chunk_size: usize,
    /// Zero disables backpressure
    pub max_buffered: usize,
    pub backoff: ExponentialBackoff,
    pub label: String,
}

/// Spawn the pump thread
pub(crate) fn spawn<S: BlockingStream>(
    stream: Arc<S>,
    shared: Arc<SharedBuffer>,
    settings: PumpSettings,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("nbserial-pump-{}", settings.label))
        .spawn(move || {
            debug!(label = %settings.label, "[PUMP] started");

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                run(stream.as_ref(), &shared, settings.clone())
            }));

            if let Err(payload) = outcome {
                let message = panic_message(payload.as_ref());
                error!(label = %settings.label, panic = %message, "[PUMP] read loop panicked");
                shared.set_terminal(Terminal::PumpFailed(message));
            }

            debug!(label = %settings.label, "[PUMP] stopped");
        })
}

/// The read loop. Returns once the terminal slot is set.
fn run<S: BlockingStream + ?Sized>(stream: &S, shared: &SharedBuffer, settings: PumpSettings) {
    let PumpSettings {
        chunk_size,
        max_buffered,
        mut backoff,
        label,
    } = settings;
    let mut chunk = vec![0u8; chunk_size];

    while !shared.is_terminated() {
        if max_buffered != 0 && shared.len() >= max_buffered {
            // Buffer full, wait for readers to make room
            trace!(label = %label, buffered = shared.len(), "[PUMP] throttled");
            backoff.miss();
            continue;
        }

        match stream.read(&mut chunk) {
            Ok(status) => {
                let n = status.len();
                shared.append(&chunk[..n]);
                if n > 0 {
                    trace!(label = %label, bytes = n, "[PUMP] read");
                    backoff.hit();
                }
                if let ReadStatus::End(_) = status {
                    if shared.set_terminal(Terminal::Ended) {
                        debug!(label = %label, "[PUMP] end of stream");
                    }
                    return;
                }
                if n == 0 {
                    // Empty read: nothing much happening on the line
                    backoff.miss();
                }
            }
            Err(e) => {
                // Only end-of-stream is terminal; anything else is retried as idle
                trace!(label = %label, error = %e, "[PUMP] read error treated as idle");
                backoff.miss();
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
