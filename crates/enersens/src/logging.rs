//! Logging for the CLI.
//!
//! Everything goes to `{data_dir}/enersens.log`. The engine reports skipped
//! levels, missing result files and correlation fallbacks as warnings; with
//! `logging.stderr_warnings` set those are also echoed to the terminal.
//! Per-module levels come from `logging.targets`, for example
//!
//! ```yaml
//! logging:
//!   level: info
//!   stderr_warnings: true
//!   targets:
//!     enersens_core::analysis::scope: debug      # scope fallbacks
//!     enersens_core::analysis::aggregator: error # silence skip warnings
//! ```
//!
//! `RUST_LOG` replaces the whole filter when set.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogSettings;

pub const LOG_FILE: &str = "enersens.log";

/// Crates whose events are logged at the base level
const OWN_TARGETS: [&str; 2] = ["enersens", "enersens_core"];

const MAX_LOG_SIZE: u64 = 5 * 1024 * 1024;
const KEEP_SIZE: u64 = 1024 * 1024;
const ROTATION_MARKER: &[u8] = b"--- Log rotated (older entries removed) ---\n";

/// Filter directives: the base level for this workspace's crates, then each
/// per-target override in name order
pub fn filter_directives(level: &str, settings: &LogSettings) -> String {
    OWN_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .chain(
            settings
                .targets
                .iter()
                .map(|(target, level)| format!("{target}={level}")),
        )
        .collect::<Vec<_>>()
        .join(",")
}

/// Cut an oversized log down to its most recent `KEEP_SIZE` bytes, starting
/// on a line boundary. Returns whether the file was trimmed.
fn trim_log(path: &Path) -> io::Result<bool> {
    let len = match fs::metadata(path) {
        Ok(metadata) => metadata.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if len <= MAX_LOG_SIZE {
        return Ok(false);
    }

    let mut tail = Vec::with_capacity(KEEP_SIZE as usize);
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(len - KEEP_SIZE))?;
    file.read_to_end(&mut tail)?;
    drop(file);

    let start = tail.iter().position(|&b| b == b'\n').map_or(0, |i| i + 1);
    let mut file = File::create(path)?;
    file.write_all(ROTATION_MARKER)?;
    file.write_all(&tail[start..])?;
    Ok(true)
}

/// Initialize file logging (and optional stderr warnings). Returns the log
/// file path.
pub fn init_logging(data_dir: &Path, level: &str, settings: &LogSettings) -> color_eyre::Result<PathBuf> {
    fs::create_dir_all(data_dir)?;
    let log_path = data_dir.join(LOG_FILE);

    let trimmed = trim_log(&log_path).unwrap_or_else(|e| {
        eprintln!("Warning: Failed to rotate log file: {e}");
        false
    });
    let file = OpenOptions::new().create(true).append(true).open(&log_path)?;

    let directives = filter_directives(level, settings);
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&directives)?,
    };

    let stderr_layer = settings.stderr_warnings.then(|| {
        fmt::layer()
            .with_writer(io::stderr.with_max_level(tracing::Level::WARN))
            .with_target(false)
            .without_time()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true),
        )
        .with(stderr_layer)
        .init();

    tracing::info!(path = %log_path.display(), filter = %directives, trimmed, "logging initialized");
    Ok(log_path)
}
