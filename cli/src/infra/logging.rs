//! Tracing setup.
//!
//! Two layers on one registry: an in-memory buffer that always records at
//! debug level, and a stderr layer only when `--verbose` is given. The
//! buffer is printed when a command fails, because the agent's own log
//! sink does not exist yet during install.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Overrides the stderr filter, e.g. `OUTPOST_LOG=outpost_cli=trace`.
pub const LOG_ENV: &str = "OUTPOST_LOG";

/// Shared in-memory log sink.
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl MemoryLog {
    /// Everything recorded so far.
    #[must_use]
    pub fn contents(&self) -> String {
        let buf = self.buf.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

pub struct MemoryLogWriter {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl io::Write for MemoryLogWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for MemoryLog {
    type Writer = MemoryLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        MemoryLogWriter {
            buf: Arc::clone(&self.buf),
        }
    }
}

fn stderr_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber and return the in-memory sink.
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place and return a sink that stays empty.
pub fn init(verbose: u8) -> MemoryLog {
    let memory = MemoryLog::default();
    let memory_layer = fmt::layer()
        .with_writer(memory.clone())
        .with_ansi(false)
        .with_target(false)
        .with_filter(LevelFilter::DEBUG);

    let stderr_layer = (verbose > 0).then(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(stderr_level(verbose)));
        fmt::layer()
            .with_writer(io::stderr)
            .with_target(false)
            .with_filter(filter)
    });

    let _ = tracing_subscriber::registry()
        .with(memory_layer)
        .with(stderr_layer)
        .try_init();
    memory
}
