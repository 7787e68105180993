// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! nbcat - copy a blocking byte source to stdout through the non-blocking adapter
//!
//! Reads stdin by default, or a TCP peer with `--connect`. Timeouts and end
//! of stream are reported through tracing on stderr.

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};

use nbserial::config::{
    apply_cli_overrides, apply_environment_overrides, load_config, validate_config, ConfigError,
    NbSerialConfig,
};
use nbserial::observability::{
    debug_flags_help, init_logging, CrateDebugFlags, LoggingOptions, DEBUG_ENV,
};
use nbserial::{BlockingStream, NonBlocking, ReadStatus, StreamError};

/// Timeout used when the configured one is zero, so the loop never spins
const FALLBACK_TIMEOUT: Duration = Duration::from_millis(500);

/// Copy a blocking byte source to stdout with deadline-bounded reads
#[derive(Parser, Debug)]
#[command(
    name = "nbcat",
    version,
    long_about = None,
    after_long_help = debug_flags_help()
)]
struct Args {
    /// Path to nbserial.toml (default: search the current and parent directories)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Read from a TCP peer instead of stdin
    #[arg(long)]
    connect: Option<String>,

    /// Bytes written to the source before reading (e.g. a device query)
    #[arg(long)]
    send: Option<String>,

    /// Read timeout in milliseconds (overrides config)
    #[arg(short, long)]
    timeout_ms: Option<u64>,

    /// Bytes per underlying read (overrides config)
    #[arg(long)]
    max_read_size: Option<usize>,

    /// Exit after this many consecutive timeouts
    #[arg(long)]
    max_idle: Option<u32>,

    /// Log level (overrides config)
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn overrides(&self) -> HashMap<String, String> {
        let mut cli = HashMap::new();
        if let Some(ms) = self.timeout_ms {
            cli.insert("reader.read_timeout_ms".to_string(), ms.to_string());
        }
        if let Some(size) = self.max_read_size {
            cli.insert("reader.max_read_size".to_string(), size.to_string());
        }
        if let Some(level) = &self.log_level {
            cli.insert("logging.level".to_string(), level.clone());
        }
        cli
    }

}

/// stdin as the read side, stdout as the write side
#[derive(Default)]
struct Stdio {
    closed: AtomicBool,
}

impl BlockingStream for Stdio {
    fn read(&self, buf: &mut [u8]) -> io::Result<ReadStatus> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(ReadStatus::End(0));
        }
        ReadStatus::from_io(io::stdin().lock().read(buf))
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut out = io::stdout().lock();
        let n = out.write(buf)?;
        out.flush()?;
        Ok(n)
    }

    /// stdin cannot be interrupted; the pump stops after its current read
    fn close(&self) -> io::Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

/// `--debug-<crate>` flags are open-ended, so they are pulled out before clap sees them
fn split_debug_args<I>(args: I) -> (CrateDebugFlags, Vec<String>)
where
    I: IntoIterator<Item = String>,
{
    let (debug_args, rest): (Vec<String>, Vec<String>) = args
        .into_iter()
        .partition(|arg| arg.starts_with("--debug-"));
    (CrateDebugFlags::from_args(debug_args), rest)
}

fn resolve_config(args: &Args) -> Result<NbSerialConfig> {
    let cli = args.overrides();
    match load_config(args.config.as_deref(), Some(&cli)) {
        Ok(config) => Ok(config),
        Err(ConfigError::FileNotFound(_)) if args.config.is_none() => {
            let mut config = NbSerialConfig::default();
            apply_environment_overrides(&mut config);
            apply_cli_overrides(&mut config, &cli);
            validate_config(&config)?;
            Ok(config)
        }
        Err(e) => Err(e).context("Failed to load configuration"),
    }
}

fn copy_to_stdout<S: BlockingStream>(
    port: &NonBlocking<S>,
    timeout: Duration,
    max_idle: Option<u32>,
) -> Result<u64> {
    let mut buf = vec![0u8; 4096];
    let mut out = io::stdout();
    let mut total = 0u64;
    let mut idle = 0u32;

    loop {
        match port.read_timeout(&mut buf, timeout) {
            Ok(n) => {
                idle = 0;
                out.write_all(&buf[..n])?;
                out.flush()?;
                total += n as u64;
            }
            Err(StreamError::DeadlineExceeded) => {
                idle += 1;
                debug!(label = %port.label(), idle, "no data before deadline");
                if max_idle.map_or(false, |max| idle >= max) {
                    info!(label = %port.label(), "idle limit reached");
                    return Ok(total);
                }
            }
            Err(StreamError::StreamEnded) => {
                info!(label = %port.label(), bytes = total, "end of stream");
                return Ok(total);
            }
            Err(e) => return Err(e).context("Read failed"),
        }
    }
}

fn run<S: BlockingStream>(stream: S, config: &NbSerialConfig, args: &Args) -> Result<()> {
    let port = nbserial::from_config(stream, config).context("Failed to start reader")?;

    if let Some(payload) = &args.send {
        port.write(payload.as_bytes()).context("Failed to send payload")?;
    }

    let timeout = match Duration::from_millis(config.reader.read_timeout_ms) {
        t if t.is_zero() => FALLBACK_TIMEOUT,
        t => t,
    };
    let total = copy_to_stdout(&port, timeout, args.max_idle)?;

    port.close()?;
    if !port.join_pump(Duration::from_millis(200)) {
        warn!(label = %port.label(), "pump still blocked in a read at exit");
    }
    debug!(bytes = total, "done");
    Ok(())
}

fn main() -> Result<()> {
    let (mut debug_flags, cli_args) = split_debug_args(std::env::args());
    let args = Args::parse_from(cli_args);
    if let Ok(list) = std::env::var(DEBUG_ENV) {
        debug_flags.merge_list(&list);
    }
    let config = resolve_config(&args)?;

    let options = LoggingOptions::default().with_base_level(config.logging.level.clone());
    let _logging = init_logging(&debug_flags, &options)?;
    if debug_flags.any_enabled() {
        debug!(crates = ?debug_flags.enabled_crates, "debug logging enabled");
    }

    match &args.connect {
        Some(addr) => {
            let stream = TcpStream::connect(addr)
                .with_context(|| format!("Failed to connect to {}", addr))?;
            info!(peer = %addr, "connected");
            run(stream, &config, &args)
        }
        None => run(Stdio::default(), &config, &args),
    }
}
