//! A failing log sink stops the aggregator and reaches the caller

mod common;

use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use airlog_core::config::{AggregatorConfig, LoggerConfig};
use airlog_core::hardware::{Script, SimulatedSht30};
use airlog_core::{
    Aggregator, LogSink, Logger, LoggerError, PipelineBuilder, PipelineError, ShutdownSignal,
};

use common::{fast_config, FAST_TICK};

/// Sink that accepts a fixed number of flushes, then reports a full disk
#[derive(Clone)]
struct FillingDisk {
    flushes_left: Arc<AtomicUsize>,
    attempts: Arc<AtomicUsize>,
}

impl FillingDisk {
    fn new(flushes: usize) -> Self {
        Self {
            flushes_left: Arc::new(AtomicUsize::new(flushes)),
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Write for FillingDisk {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let left = self.flushes_left.load(Ordering::SeqCst);
        if left == 0 {
            return Err(io::Error::new(io::ErrorKind::Other, "no space left on device"));
        }
        self.flushes_left.store(left - 1, Ordering::SeqCst);
        Ok(())
    }
}

impl LogSink for FillingDisk {
    fn sync(&self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn aggregator_run_stops_on_write_failure() {
    // Header plus two rows fit, the third row fails
    let disk = FillingDisk::new(3);
    let logger = Logger::from_sink(disk.clone(), "disk", &LoggerConfig::default()).unwrap();

    let config = AggregatorConfig::default().with_tick_interval(Duration::from_millis(5));
    let mut aggregator = Aggregator::new(logger, ShutdownSignal::new(), &config);

    let outcome = aggregator.run();
    assert!(matches!(outcome, Err(LoggerError::Io(_))));
    assert_eq!(aggregator.stats().rows_written, 2);
    assert!(aggregator.logger().is_closed());

    // No further ticks after the failure
    let attempts = disk.attempts();
    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(disk.attempts(), attempts);
}

#[test]
fn pipeline_reports_logger_failure_and_joins_sensors() {
    let dir = tempfile::tempdir().unwrap();
    let disk = FillingDisk::new(4);
    let logger = Logger::from_sink(disk, "disk", &LoggerConfig::default()).unwrap();

    let pipeline = PipelineBuilder::new(fast_config(dir.path()))
        .with_logger(logger)
        .with_sht30_primary(SimulatedSht30::new(0x44, Script::constant((0x6666, 0x8000))))
        .build()
        .unwrap();
    let shutdown = pipeline.shutdown_signal();

    let started = Instant::now();
    let outcome = pipeline.run_for(Duration::from_secs(30));

    assert!(matches!(outcome, Err(PipelineError::Logger(LoggerError::Io(_)))));
    assert!(started.elapsed() < FAST_TICK * 50);
    assert!(shutdown.is_triggered());
}

#[test]
fn running_pipeline_ends_on_its_own_after_failure() {
    let dir = tempfile::tempdir().unwrap();
    let logger = Logger::from_sink(FillingDisk::new(2), "disk", &LoggerConfig::default()).unwrap();

    let running = PipelineBuilder::new(fast_config(dir.path()))
        .with_logger(logger)
        .with_sht30_primary(SimulatedSht30::new(0x44, Script::constant((0x6666, 0x8000))))
        .build()
        .unwrap()
        .start()
        .unwrap();

    assert!(common::wait_until(Duration::from_secs(5), || running.is_finished()));
    assert!(running.shutdown_signal().is_triggered());
    assert!(matches!(running.wait(), Err(PipelineError::Logger(_))));
}
