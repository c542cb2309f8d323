//! Logger: append-only CSV log
//!
//! The logger owns its file for its whole lifetime. The header is written
//! and flushed on creation, so a file with no data rows is still
//! well-formed. Every [`Logger::write`] flushes before returning; with
//! `sync_each_row` it also `fsync`s, trading throughput for durability.
//!
//! A new file is never truncated: when the timestamped name already exists
//! a numeric suffix is added (`airlog_20240102_030405-1.csv`).

use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::config::LoggerConfig;
use crate::constants::LOG_FILE_NAME_FORMAT;
use crate::errors::{LoggerError, LoggerResult};
use crate::record::{LogRecord, COLUMNS};

/// Most suffixed names tried before giving up on a free file name
const MAX_NAME_ATTEMPTS: u32 = 100;

/// Byte destination of the log
///
/// Implemented for [`File`]; other sinks let the logger write somewhere
/// other than the local file system.
pub trait LogSink: Write + Send {
    /// Push everything written so far to durable storage
    fn sync(&self) -> io::Result<()>;
}

impl LogSink for File {
    fn sync(&self) -> io::Result<()> {
        self.sync_data()
    }
}

/// Append-only CSV log
pub struct Logger {
    writer: Option<csv::Writer<Box<dyn LogSink>>>,
    path: PathBuf,
    placeholder: String,
    sync_each_row: bool,
    rows_written: u64,
}

impl Logger {
    /// Create the output file and write its header
    pub fn create(config: &LoggerConfig) -> LoggerResult<Self> {
        fs::create_dir_all(&config.output_dir)?;

        let (file, path, write_header) = match &config.file_name {
            Some(name) => open_named(&config.output_dir.join(name), config.append)?,
            None => {
                let (file, path) = create_timestamped(&config.output_dir)?;
                (file, path, true)
            }
        };

        let logger = Self::open(Box::new(file), path, write_header, config)?;
        info!("logging to {}", logger.path.display());
        Ok(logger)
    }

    /// Log into `sink`, labelled `path` in diagnostics
    ///
    /// The header is always written. Only the placeholder and
    /// `sync_each_row` settings of `config` apply.
    pub fn from_sink(
        sink: impl LogSink + 'static,
        path: impl Into<PathBuf>,
        config: &LoggerConfig,
    ) -> LoggerResult<Self> {
        Self::open(Box::new(sink), path.into(), true, config)
    }

    fn open(
        sink: Box<dyn LogSink>,
        path: PathBuf,
        write_header: bool,
        config: &LoggerConfig,
    ) -> LoggerResult<Self> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(sink);
        if write_header {
            writer.write_record(COLUMNS)?;
        }
        writer.flush()?;
        if config.sync_each_row {
            writer.get_ref().sync()?;
        }

        Ok(Self {
            writer: Some(writer),
            path,
            placeholder: config.placeholder.clone(),
            sync_each_row: config.sync_each_row,
            rows_written: 0,
        })
    }

    /// Append one row and flush it
    pub fn write(&mut self, record: &LogRecord) -> LoggerResult<()> {
        let writer = self.writer.as_mut().ok_or(LoggerError::Closed)?;

        writer.write_record(record.to_row(&self.placeholder))?;
        writer.flush()?;
        if self.sync_each_row {
            writer.get_ref().sync()?;
        }

        self.rows_written += 1;
        Ok(())
    }

    /// Flush and release the sink; later calls do nothing
    ///
    /// The sink is released even when the final flush fails.
    pub fn close(&mut self) -> LoggerResult<()> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };

        writer.flush()?;
        let sink = writer.into_inner().map_err(|e| LoggerError::Io(e.into_error()))?;
        sink.sync()?;

        info!("closed {} after {} rows", self.path.display(), self.rows_written);
        Ok(())
    }

    /// Whether `close` has run
    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    /// Path of the output file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Data rows written by this logger (header excluded)
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }
}

impl core::fmt::Debug for Logger {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Logger")
            .field("path", &self.path)
            .field("closed", &self.is_closed())
            .field("rows_written", &self.rows_written)
            .finish()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if let Err(error) = self.close() {
            warn!("failed to close {}: {}", self.path.display(), error);
        }
    }
}

fn open_named(path: &Path, append: bool) -> LoggerResult<(File, PathBuf, bool)> {
    if append {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let write_header = file.metadata()?.len() == 0;
        debug!("appending to {} (header: {})", path.display(), write_header);
        return Ok((file, path.to_path_buf(), write_header));
    }

    let file = OpenOptions::new().write(true).create_new(true).open(path)?;
    Ok((file, path.to_path_buf(), true))
}

fn create_timestamped(dir: &Path) -> LoggerResult<(File, PathBuf)> {
    let base = chrono::Local::now().format(LOG_FILE_NAME_FORMAT).to_string();
    let stem = base.trim_end_matches(".csv");

    for attempt in 0..MAX_NAME_ATTEMPTS {
        let name = if attempt == 0 {
            base.clone()
        } else {
            format!("{stem}-{attempt}.csv")
        };
        let path = dir.join(name);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((file, path)),
            Err(error) if error.kind() == ErrorKind::AlreadyExists => continue,
            Err(error) => return Err(error.into()),
        }
    }

    Err(LoggerError::Io(io::Error::new(
        ErrorKind::AlreadyExists,
        format!("no free log file name for {base} in {}", dir.display()),
    )))
}
