//! Trace log output
//!
//! Every emitted line is framed with a fixed preamble so downstream miners
//! can pick trace lines out of arbitrary interleaved process output. The
//! default sink is a randomly named `<8-hex>_<16-hex>.ae.log` file in the
//! working directory, and the process's stderr is redirected into the same
//! file so host diagnostics land next to the traces. Tests substitute an
//! in-memory sink.

use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Magic prefix downstream parsers key on.
pub const PREAMBLE: &str = "AutoEPEx";
/// Suffix of the randomized log file.
pub const LOG_SUFFIX: &str = ".ae.log";

const PREAMBLE_SEP: &str = ": ";
const NEW_FILE_MARKER: &str = "NEW FILE";

/// Append-only, line-framed trace sink shared by all paths of a process.
pub struct TraceLog {
    sink: Mutex<Box<dyn Write + Send>>,
}

impl TraceLog {
    /// Wrap an arbitrary sink.
    pub fn new(sink: Box<dyn Write + Send>) -> Self {
        TraceLog {
            sink: Mutex::new(sink),
        }
    }

    /// Create the randomized log file in the working directory, redirect
    /// stderr into it, and return the log with the chosen file name.
    pub fn open_randomized() -> Result<(Self, PathBuf), String> {
        let name = random_log_name();
        let file =
            File::create(&name).map_err(|e| format!("Failed to create {name}: {e}"))?;
        redirect_stderr(&file)?;
        debug!(file = %name, "trace log opened");
        Ok((Self::new(Box::new(file)), PathBuf::from(name)))
    }

    /// Emit one framed line: `<preamble>: <body>\n`.
    pub fn line(&self, body: &str) {
        if let Ok(mut sink) = self.sink.lock() {
            let _ = writeln!(sink, "{PREAMBLE}{PREAMBLE_SEP}{body}");
            let _ = sink.flush();
        }
    }

    /// Startup marker separating runs in collected logs.
    pub fn banner(&self) {
        self.line(NEW_FILE_MARKER);
    }
}

/// `<8-hex random>_<16-hex wall-clock seconds>.ae.log`
fn random_log_name() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("{:08x}_{:016x}{}", random_u32(secs), secs, LOG_SUFFIX)
}

/// Four random bytes from the OS, or a time-seeded fallback when the OS
/// source is unavailable. Never fatal.
fn random_u32(fallback_seed: u64) -> u32 {
    let mut bytes = [0u8; 4];
    if OsRng.try_fill_bytes(&mut bytes).is_ok() {
        u32::from_le_bytes(bytes)
    } else {
        StdRng::seed_from_u64(fallback_seed).next_u32()
    }
}

#[cfg(unix)]
fn redirect_stderr(file: &File) -> Result<(), String> {
    use std::os::unix::io::AsRawFd;
    let rc = unsafe { libc::dup2(file.as_raw_fd(), libc::STDERR_FILENO) };
    if rc < 0 {
        Err(format!(
            "Failed to redirect stderr: {}",
            io::Error::last_os_error()
        ))
    } else {
        Ok(())
    }
}

#[cfg(not(unix))]
fn redirect_stderr(_file: &File) -> Result<(), String> {
    Ok(())
}

/// Install the process-wide diagnostic subscriber, filtered by `RUST_LOG`.
/// Safe to call more than once; later calls are no-ops.
pub fn init_diagnostics() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init();
}
