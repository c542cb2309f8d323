//! Error Types for the Acquisition Pipeline
//!
//! ## Error Categories
//!
//! Errors are split by who is allowed to see them:
//!
//! ### Transient hardware faults (`HardwareError`)
//! - Bus busy, short reads, checksum mismatches, device fault status
//! - Caught at the sensor task boundary, logged, iteration skipped
//! - Never reach the aggregator and never stop a task
//!
//! ### Sink failures (`LoggerError`)
//! - Disk full, permissions, writes after close
//! - Fatal: the log file is the only durable output, so the aggregator
//!   returns these to the host instead of dropping rows silently
//!
//! ### Setup failures (`ConfigError`, `PipelineError`)
//! - Rejected configuration values, thread spawn failures, task panics
//!
//! An absent sensor is not an error anywhere in this crate. Sources report
//! it as `Ok(None)` and it travels as "no data" to the log row.
//!
//! ```rust
//! use airlog_core::errors::HardwareError;
//!
//! fn classify(err: &HardwareError) -> &'static str {
//!     match err {
//!         HardwareError::Checksum { .. } => "corrupted frame, retry",
//!         HardwareError::DeviceFault { .. } => "device reported fault, retry",
//!         _ => "bus trouble, retry",
//!     }
//! }
//! ```

use thiserror_no_std::Error;

/// Result type for hardware collaborator calls
pub type HardwareResult<T> = Result<T, HardwareError>;

/// Result type for logger operations
pub type LoggerResult<T> = Result<T, LoggerError>;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for pipeline setup and shutdown
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Transient hardware faults raised by bus collaborators and sensor sources
#[derive(Error, Debug)]
pub enum HardwareError {
    /// Underlying bus I/O failed (EIO, ENXIO, timeout...)
    #[error("bus I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// Device answered with fewer bytes than the frame needs
    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead {
        /// Bytes required by the frame layout
        expected: usize,
        /// Bytes actually returned
        actual: usize,
    },

    /// CRC over a data word did not match
    #[error("checksum mismatch on word {word}")]
    Checksum {
        /// Index of the offending word within the frame
        word: usize,
    },

    /// Device status bits flagged an internal fault
    #[error("device reported fault status {status}")]
    DeviceFault {
        /// Raw status field
        status: u8,
    },

    /// Bus is owned elsewhere or temporarily unavailable
    #[error("bus busy")]
    Busy,

    /// Device output could not be parsed
    #[error("unparseable device output: {reason}")]
    Parse {
        /// What was wrong with the output
        reason: &'static str,
    },
}

/// Failures of the append-only log sink
#[derive(Error, Debug)]
pub enum LoggerError {
    /// File creation, write, flush or sync failed
    #[error("log file I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// Row serialisation failed
    #[error("log row encoding failure: {0}")]
    Csv(#[from] csv::Error),

    /// `write` was called after `close`
    #[error("logger already closed")]
    Closed,
}

/// Rejected configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A field holds a value outside its domain
    #[error("invalid `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the field
        field: &'static str,
        /// Why the value was rejected
        reason: &'static str,
    },

    /// Configuration text is not valid JSON for the schema
    #[error("configuration parse failure: {0}")]
    Parse(#[from] serde_json::Error),

    /// Configuration file could not be read
    #[error("configuration read failure: {0}")]
    Read(#[from] std::io::Error),
}

/// Failures surfaced by the pipeline runner to its host
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Log sink failed; acquisition was stopped
    #[error("log sink failed: {0}")]
    Logger(#[from] LoggerError),

    /// Configuration was rejected before start
    #[error("configuration rejected: {0}")]
    Config(#[from] ConfigError),

    /// A sensor or aggregator thread could not be created
    #[error("failed to spawn pipeline thread: {0}")]
    Spawn(std::io::Error),

    /// A sensor or aggregator thread panicked
    #[error("sensor task `{sensor}` panicked")]
    TaskPanicked {
        /// Name of the task
        sensor: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hardware_error_messages() {
        let err = HardwareError::ShortRead { expected: 6, actual: 2 };
        assert_eq!(err.to_string(), "short read: expected 6 bytes, got 2");

        let err = HardwareError::Checksum { word: 1 };
        assert_eq!(err.to_string(), "checksum mismatch on word 1");
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err: LoggerError = io.into();
        assert!(matches!(err, LoggerError::Io(_)));

        let pipeline: PipelineError = err.into();
        assert!(pipeline.to_string().contains("disk full"));
    }
}
