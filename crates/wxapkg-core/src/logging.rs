//! Tracing setup: append to `~/.local/state/wxapkg/wxapkg.log`, or log to
//! stderr when the state dir is unusable.
//!
//! The filter comes from `WXAPKG_LOG`, then `RUST_LOG`, then [`DEFAULT_FILTER`].

use anyhow::{Context, Result};
use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "info,wxapkg_core=debug,wxapkg=debug";
pub const FILTER_ENV: &str = "WXAPKG_LOG";
const LOG_FILE_NAME: &str = "wxapkg.log";

/// Where log records end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    File(PathBuf),
    Stderr,
}

impl fmt::Display for LogTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogTarget::File(p) => write!(f, "{}", p.display()),
            LogTarget::Stderr => f.write_str("stderr"),
        }
    }
}

/// Per-record writer: a clone of the log file handle, or stderr when cloning fails.
enum RecordWriter {
    File(File),
    Stderr,
}

impl io::Write for RecordWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            RecordWriter::File(f) => f.write(buf),
            RecordWriter::Stderr => io::stderr().lock().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            RecordWriter::File(f) => f.flush(),
            RecordWriter::Stderr => io::stderr().lock().flush(),
        }
    }
}

struct LogFile(File);

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = RecordWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.0
            .try_clone()
            .map(RecordWriter::File)
            .unwrap_or(RecordWriter::Stderr)
    }
}

/// First parseable of `primary` (`WXAPKG_LOG`) and `fallback` (`RUST_LOG`), else the default.
fn filter_from(primary: Option<&str>, fallback: Option<&str>) -> EnvFilter {
    [primary, fallback]
        .into_iter()
        .flatten()
        .find_map(|v| EnvFilter::try_new(v).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

fn env_filter() -> EnvFilter {
    let primary = std::env::var(FILTER_ENV).ok();
    let fallback = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    filter_from(primary.as_deref(), fallback.as_deref())
}

pub fn log_file_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("wxapkg")?;
    Ok(xdg_dirs.get_state_home().join(LOG_FILE_NAME))
}

fn open_append(path: &Path) -> Result<File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))
}

/// Install the file subscriber. Errors leave no subscriber installed.
pub fn init_logging() -> Result<PathBuf> {
    let path = log_file_path()?;
    let file = open_append(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(BoxMakeWriter::new(LogFile(file)))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install subscriber: {e}"))?;

    tracing::info!("wxapkg {} logging to {}", env!("CARGO_PKG_VERSION"), path.display());
    Ok(path)
}

/// Install a stderr-only subscriber. A no-op if one is already installed.
pub fn init_logging_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(io::stderr)
        .with_ansi(false)
        .try_init();
}

/// File logging, or stderr when the log file cannot be opened.
pub fn init() -> LogTarget {
    match init_logging() {
        Ok(path) => LogTarget::File(path),
        Err(err) => {
            init_logging_stderr();
            tracing::warn!("file logging unavailable: {:#}", err);
            LogTarget::Stderr
        }
    }
}
