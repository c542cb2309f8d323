//! Common test utilities for integration tests
//!
//! This module provides:
//! - Fast pipeline configurations writing into a temporary directory
//! - CSV readers for the produced log
//! - Scripted sensor fixtures
//! - Polling helpers for threaded assertions

#![allow(dead_code)]

use std::path::Path;
use std::time::{Duration, Instant};

use airlog_core::config::{AggregatorConfig, LoggerConfig, PipelineConfig};
use airlog_core::hardware::{Script, SimulatedOneWire};
use airlog_core::record::COLUMNS;
use airlog_core::sample::OneWireRaw;
use airlog_core::CapacityPolicy;

/// Aggregator tick used by threaded tests
pub const FAST_TICK: Duration = Duration::from_millis(20);

/// Column index by name
pub fn column(name: &str) -> usize {
    COLUMNS
        .iter()
        .position(|c| *c == name)
        .unwrap_or_else(|| panic!("unknown column {name}"))
}

/// Logger config writing into `dir`
pub fn logger_config(dir: &Path) -> LoggerConfig {
    LoggerConfig::default().with_output_dir(dir)
}

/// Pipeline config with short intervals, writing into `dir`
pub fn fast_config(dir: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default()
        .with_aggregator(AggregatorConfig::default().with_tick_interval(FAST_TICK))
        .with_logger(logger_config(dir))
        .with_channel_policy(CapacityPolicy::DropOldest(8))
        .with_fault_backoff(Duration::from_millis(5));
    config.ds18b20.poll_interval_ms = 10;
    config.sht30_primary.poll_interval_ms = 10;
    config.sht30_primary.measurement_wait_ms = 0;
    config.sht30_secondary.poll_interval_ms = 10;
    config.sht30_secondary.measurement_wait_ms = 0;
    config.ms4525.poll_interval_ms = 10;
    config.fl808.window_s = 0.01;
    config
}

/// Header and data rows of a log file
pub fn read_log(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .expect("log file readable");
    let header = reader
        .headers()
        .expect("header row")
        .iter()
        .map(str::to_owned)
        .collect();
    let rows = reader
        .records()
        .map(|row| row.expect("valid row").iter().map(str::to_owned).collect())
        .collect();
    (header, rows)
}

/// Two steady DS18B20 probes, listed out of id order
pub fn two_probes() -> SimulatedOneWire {
    SimulatedOneWire::new(Script::constant(vec![
        OneWireRaw { device_id: "28-bbbb".into(), raw: 400 },
        OneWireRaw { device_id: "28-aaaa".into(), raw: -8 },
    ]))
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}
